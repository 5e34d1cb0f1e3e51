//! Named page components.
//!
//! The registry is built once while the page is assembled and then passed by
//! reference to whatever needs to look a component up by name, mainly the
//! [`EventRouter`](crate::router::EventRouter).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::components::{FeatureCardHover, PricingToggle};
use crate::host::TargetRef;
use crate::metrics::MetricsSink;
use crate::rotator::Rotator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Rotator,
    Pricing,
    FeatureCard,
    Field,
}

pub enum Component {
    Rotator(Rotator),
    Pricing(PricingToggle),
    /// A card driven by the shared [`FeatureCardHover`].
    FeatureCard(TargetRef),
    /// A form field validated on blur.
    Field(TargetRef),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Rotator(_) => ComponentKind::Rotator,
            Self::Pricing(_) => ComponentKind::Pricing,
            Self::FeatureCard(_) => ComponentKind::FeatureCard,
            Self::Field(_) => ComponentKind::Field,
        }
    }
}

pub struct ComponentRegistry {
    components: BTreeMap<String, Component>,
    hover: FeatureCardHover,
    metrics: MetricsSink,
}

impl ComponentRegistry {
    pub fn new(hover: FeatureCardHover, metrics: MetricsSink) -> Self {
        Self {
            components: BTreeMap::new(),
            hover,
            metrics,
        }
    }

    /// Register `component` under `name`. Names are unique; a second
    /// registration under the same name is rejected.
    pub fn register(&mut self, name: impl Into<String>, component: Component) -> bool {
        let name = name.into();
        if self.components.contains_key(&name) {
            warn!(name = %name, kind = ?component.kind(), "component name already taken");
            return false;
        }
        debug!(name = %name, kind = ?component.kind(), "component registered");
        self.components.insert(name, component);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn rotator(&self, name: &str) -> Option<&Rotator> {
        match self.components.get(name)? {
            Component::Rotator(rotator) => Some(rotator),
            _ => None,
        }
    }

    pub fn pricing(&self, name: &str) -> Option<&PricingToggle> {
        match self.components.get(name)? {
            Component::Pricing(toggle) => Some(toggle),
            _ => None,
        }
    }

    /// Names of every component of `kind`, sorted.
    pub fn names_of(&self, kind: ComponentKind) -> Vec<&str> {
        self.components
            .iter()
            .filter(|(_, c)| c.kind() == kind)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn hover(&self) -> &FeatureCardHover {
        &self.hover
    }

    pub fn metrics(&self) -> &MetricsSink {
        &self.metrics
    }

    /// Start every rotator configured to auto-start. Returns how many were
    /// started.
    pub fn start_rotators(&self) -> usize {
        let mut started = 0;
        for component in self.components.values() {
            if let Component::Rotator(rotator) = component {
                if rotator.auto_start() {
                    rotator.start();
                    started += 1;
                }
            }
        }
        started
    }

    /// Pause every rotator, e.g. before the page is torn down.
    pub fn pause_rotators(&self) {
        for component in self.components.values() {
            if let Component::Rotator(rotator) = component {
                rotator.pause();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::StagedAnimationEngine;
    use crate::components::BillingPeriod;
    use crate::host::headless::{Element, HeadlessHost};
    use crate::interaction::InteractionDebouncer;
    use crate::rotator::RotatorMode;
    use std::rc::Rc;
    use vitrine_config::{HoverConfig, MetricsConfig, PricingConfig, RotatorConfig};

    fn registry(page: &HeadlessHost) -> (ComponentRegistry, StagedAnimationEngine) {
        let host = page.host();
        let metrics = MetricsSink::new(&host, &MetricsConfig::default()).unwrap();
        let engine = StagedAnimationEngine::new(host.scheduler.clone(), Rc::new(metrics.clone()));
        let hover = FeatureCardHover::new(engine.clone(), HoverConfig::default());
        (ComponentRegistry::new(hover, metrics), engine)
    }

    fn rotator(page: &HeadlessHost, engine: &StagedAnimationEngine, auto_start: bool) -> Rotator {
        let host = page.host();
        let config = RotatorConfig {
            auto_start,
            ..RotatorConfig::default()
        };
        Rotator::new(
            "dashboard",
            vec![Element::new("div") as TargetRef, Element::new("div") as TargetRef],
            Vec::new(),
            &host,
            engine.clone(),
            Rc::new(InteractionDebouncer::new(host.clock.clone())),
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let page = HeadlessHost::new();
        let (mut registry, engine) = registry(&page);

        assert!(registry.register("dashboard", Component::Rotator(rotator(&page, &engine, true))));
        assert!(registry.register(
            "pricing",
            Component::Pricing(PricingToggle::new(
                Vec::new(),
                Vec::new(),
                engine.clone(),
                PricingConfig::default(),
                BillingPeriod::Monthly,
            ))
        ));
        assert!(registry.register("email", Component::Field(Element::new("input"))));

        assert_eq!(registry.len(), 3);
        assert!(registry.rotator("dashboard").is_some());
        assert!(registry.rotator("pricing").is_none());
        assert!(registry.pricing("pricing").is_some());
        assert_eq!(registry.get("email").map(Component::kind), Some(ComponentKind::Field));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let page = HeadlessHost::new();
        let (mut registry, _) = registry(&page);

        assert!(registry.register("card", Component::FeatureCard(Element::new("div"))));
        assert!(!registry.register("card", Component::Field(Element::new("input"))));
        assert_eq!(registry.get("card").map(Component::kind), Some(ComponentKind::FeatureCard));
    }

    #[test]
    fn test_names_of_kind_sorted() {
        let page = HeadlessHost::new();
        let (mut registry, _) = registry(&page);
        for name in ["card-b", "card-a", "name"] {
            let component = if name.starts_with("card") {
                Component::FeatureCard(Element::new("div"))
            } else {
                Component::Field(Element::new("input"))
            };
            registry.register(name, component);
        }
        assert_eq!(registry.names_of(ComponentKind::FeatureCard), vec!["card-a", "card-b"]);
        assert_eq!(registry.names_of(ComponentKind::Rotator), Vec::<&str>::new());
    }

    #[test]
    fn test_start_rotators_honors_auto_start() {
        let page = HeadlessHost::new();
        let (mut registry, engine) = registry(&page);
        registry.register("auto", Component::Rotator(rotator(&page, &engine, true)));
        registry.register("manual", Component::Rotator(rotator(&page, &engine, false)));

        assert_eq!(registry.start_rotators(), 1);
        assert_eq!(registry.rotator("auto").map(Rotator::mode), Some(RotatorMode::AutoPlaying));
        assert_eq!(registry.rotator("manual").map(Rotator::mode), Some(RotatorMode::Idle));

        registry.pause_rotators();
        assert_eq!(registry.rotator("auto").map(Rotator::mode), Some(RotatorMode::Paused));
    }
}
