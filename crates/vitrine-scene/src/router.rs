//! Event router: paper-thin dispatch from page events to components.
//!
//! Find the named component, call the matching method, done. Timer ticks and
//! visibility changes do not pass through here; they arrive through the
//! scheduler and the visibility trigger the components registered with.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::registry::{Component, ComponentRegistry};
use crate::validation::{self, INVALID_CLASS};

/// Inbound user or page event addressed to a named component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    Hover { widget: String },
    Leave { widget: String },
    /// Click on control `control` of the widget: a rotator tab or a pricing
    /// period button.
    Click { widget: String, control: usize },
    InputBlur { field: String },
    InputChange { field: String, value: String },
    /// Error raised by page script outside any component.
    UncaughtError { message: String },
    /// Rejected asynchronous operation.
    Rejection { reason: String },
}

/// Routes events to the appropriate components.
pub struct EventRouter;

impl EventRouter {
    /// Dispatch `event`. Returns whether a component handled it; events for
    /// unknown names or of the wrong kind are logged and dropped.
    pub fn route(registry: &ComponentRegistry, event: &PageEvent) -> bool {
        match event {
            PageEvent::Hover { widget } => match Self::lookup(registry, widget) {
                Some(Component::Rotator(rotator)) => {
                    rotator.on_hover();
                    true
                }
                Some(Component::FeatureCard(card)) => registry.hover().on_hover(card),
                other => Self::unhandled(event, other),
            },
            PageEvent::Leave { widget } => match Self::lookup(registry, widget) {
                Some(Component::Rotator(rotator)) => {
                    rotator.on_leave();
                    true
                }
                Some(Component::FeatureCard(card)) => {
                    registry.hover().on_leave(card);
                    true
                }
                other => Self::unhandled(event, other),
            },
            PageEvent::Click { widget, control } => match Self::lookup(registry, widget) {
                Some(Component::Rotator(rotator)) => rotator.switch_to(*control),
                Some(Component::Pricing(toggle)) => match toggle.control_period(*control) {
                    Some(period) => {
                        toggle.set_period(period);
                        true
                    }
                    None => {
                        warn!(widget = %widget, control, "no such pricing control");
                        false
                    }
                },
                other => Self::unhandled(event, other),
            },
            PageEvent::InputBlur { field } => match Self::lookup(registry, field) {
                Some(Component::Field(target)) => {
                    validation::validate_field(target.as_ref());
                    true
                }
                other => Self::unhandled(event, other),
            },
            PageEvent::InputChange { field, value } => match Self::lookup(registry, field) {
                Some(Component::Field(target)) => {
                    target.set_attribute("value", value);
                    // Only re-check fields already flagged, so typing never
                    // raises a fresh error before blur.
                    if target.has_class(INVALID_CLASS) {
                        validation::validate_field(target.as_ref());
                    }
                    true
                }
                other => Self::unhandled(event, other),
            },
            PageEvent::UncaughtError { message } => {
                registry.metrics().record_uncaught_error(message);
                true
            }
            PageEvent::Rejection { reason } => {
                registry.metrics().record_rejection(reason);
                true
            }
        }
    }

    fn lookup<'a>(registry: &'a ComponentRegistry, name: &str) -> Option<&'a Component> {
        let component = registry.get(name);
        if component.is_none() {
            warn!(name, "event for unknown component");
        }
        component
    }

    fn unhandled(event: &PageEvent, component: Option<&Component>) -> bool {
        if let Some(component) = component {
            debug!(?event, kind = ?component.kind(), "component does not handle event");
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::StagedAnimationEngine;
    use crate::components::{BillingPeriod, FeatureCardHover, PricingToggle};
    use crate::host::headless::{Element, HeadlessHost};
    use crate::host::{Target, TargetRef};
    use crate::interaction::InteractionDebouncer;
    use crate::metrics::MetricsSink;
    use crate::rotator::{Rotator, RotatorMode};
    use std::rc::Rc;
    use vitrine_config::{HoverConfig, MetricsConfig, PricingConfig, RotatorConfig};

    struct Page {
        host: HeadlessHost,
        registry: ComponentRegistry,
        card: Rc<Element>,
        email: Rc<Element>,
    }

    fn page() -> Page {
        let host = HeadlessHost::new();
        let caps = host.host();
        let metrics = MetricsSink::new(&caps, &MetricsConfig::default()).unwrap();
        let engine = StagedAnimationEngine::new(caps.scheduler.clone(), Rc::new(metrics.clone()));
        let mut registry = ComponentRegistry::new(
            FeatureCardHover::new(engine.clone(), HoverConfig::default()),
            metrics,
        );

        let rotator = Rotator::new(
            "dashboard",
            (0..3).map(|_| Element::new("div") as TargetRef).collect(),
            Vec::new(),
            &caps,
            engine.clone(),
            Rc::new(InteractionDebouncer::new(caps.clock.clone())),
            RotatorConfig::default(),
        )
        .unwrap();
        registry.register("dashboard", Component::Rotator(rotator));

        let annual: TargetRef = Element::new("button");
        let monthly: TargetRef = Element::new("button");
        registry.register(
            "pricing",
            Component::Pricing(PricingToggle::new(
                Vec::new(),
                vec![(BillingPeriod::Monthly, monthly), (BillingPeriod::Annual, annual)],
                engine,
                PricingConfig::default(),
                BillingPeriod::Monthly,
            )),
        );

        let card = Element::new("div").with_class("feature-card");
        registry.register("analytics", Component::FeatureCard(card.clone()));

        let email = Element::new("input")
            .with_attr("type", "email")
            .with_attr("required", "")
            .with_child(Element::new("span").with_class("field-error"));
        registry.register("email", Component::Field(email.clone()));

        Page {
            host,
            registry,
            card,
            email,
        }
    }

    fn click(widget: &str, control: usize) -> PageEvent {
        PageEvent::Click {
            widget: widget.into(),
            control,
        }
    }

    #[test]
    fn test_click_routes_to_rotator_and_pricing() {
        let p = page();
        assert!(EventRouter::route(&p.registry, &click("dashboard", 2)));
        assert_eq!(p.registry.rotator("dashboard").map(Rotator::current_index), Some(2));
        assert!(!EventRouter::route(&p.registry, &click("dashboard", 7)));

        assert!(EventRouter::route(&p.registry, &click("pricing", 1)));
        assert_eq!(
            p.registry.pricing("pricing").map(PricingToggle::period),
            Some(BillingPeriod::Annual)
        );
        assert!(!EventRouter::route(&p.registry, &click("pricing", 5)));
    }

    #[test]
    fn test_hover_and_leave() {
        let p = page();
        assert_eq!(p.registry.start_rotators(), 1);
        let dashboard = PageEvent::Hover {
            widget: "dashboard".into(),
        };
        assert!(EventRouter::route(&p.registry, &dashboard));
        assert_eq!(
            p.registry.rotator("dashboard").map(Rotator::mode),
            Some(RotatorMode::Paused)
        );

        let hover_card = PageEvent::Hover {
            widget: "analytics".into(),
        };
        assert!(EventRouter::route(&p.registry, &hover_card));
        assert!(p.card.style("transform").is_some());
        // Still lifting.
        assert!(!EventRouter::route(&p.registry, &hover_card));

        let leave_card = PageEvent::Leave {
            widget: "analytics".into(),
        };
        assert!(EventRouter::route(&p.registry, &leave_card));
        assert_eq!(p.card.style("transform").as_deref(), Some("translateY(0) scale(1)"));
    }

    #[test]
    fn test_field_blur_and_change() {
        let p = page();
        let blur = PageEvent::InputBlur {
            field: "email".into(),
        };
        assert!(EventRouter::route(&p.registry, &blur));
        assert!(p.email.has_class(INVALID_CLASS));

        let typed = PageEvent::InputChange {
            field: "email".into(),
            value: "ada@example.com".into(),
        };
        assert!(EventRouter::route(&p.registry, &typed));
        assert!(!p.email.has_class(INVALID_CLASS));
        assert_eq!(p.email.attribute("value").as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_change_does_not_flag_untouched_field() {
        let p = page();
        let typed = PageEvent::InputChange {
            field: "email".into(),
            value: "ada@".into(),
        };
        assert!(EventRouter::route(&p.registry, &typed));
        assert!(!p.email.has_class(INVALID_CLASS));
    }

    #[test]
    fn test_unknown_and_mismatched_targets() {
        let p = page();
        assert!(!EventRouter::route(&p.registry, &click("nowhere", 0)));
        assert!(!EventRouter::route(
            &p.registry,
            &PageEvent::InputBlur {
                field: "dashboard".into()
            }
        ));
        assert!(!EventRouter::route(&p.registry, &click("analytics", 0)));
    }

    #[test]
    fn test_errors_reach_metrics() {
        let p = page();
        EventRouter::route(
            &p.registry,
            &PageEvent::UncaughtError {
                message: "TypeError: x is undefined".into(),
            },
        );
        EventRouter::route(
            &p.registry,
            &PageEvent::Rejection {
                reason: "network".into(),
            },
        );
        let snapshot = p.registry.metrics().get_metrics();
        assert_eq!(snapshot.error_count, 2);
        assert_eq!(snapshot.rejection_count, 1);
        p.host.advance(0);
    }

    #[test]
    fn test_event_json_shape() {
        let event: PageEvent =
            serde_json::from_str(r#"{"type":"click","widget":"dashboard","control":1}"#).unwrap();
        assert_eq!(event, click("dashboard", 1));
    }
}
