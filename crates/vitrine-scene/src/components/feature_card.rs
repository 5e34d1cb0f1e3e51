//! Feature card hover lift.

use tracing::trace;
use vitrine_config::HoverConfig;

use crate::animation::{StagedAnimation, StagedAnimationEngine};
use crate::host::TargetRef;

pub const ICON_SELECTOR: &str = ".feature-icon";
pub const HOVERED_CLASS: &str = "is-hovered";

/// Length of the CSS lift transition. The card counts as animating until it
/// has elapsed.
pub const LIFT_SETTLE_MS: u64 = 300;

pub struct FeatureCardHover {
    engine: StagedAnimationEngine,
    config: HoverConfig,
}

impl FeatureCardHover {
    pub fn new(engine: StagedAnimationEngine, config: HoverConfig) -> Self {
        Self { engine, config }
    }

    /// Lift `card` and tilt its icon.
    ///
    /// Ignored while the card is still animating. Returns whether the lift
    /// started.
    pub fn on_hover(&self, card: &TargetRef) -> bool {
        let lifted = format!(
            "translateY(-{}px) scale({})",
            self.config.lift_px, self.config.scale
        );
        let lift = StagedAnimation::new("card-lift")
            .then_styles(0, &[("transform", lifted.as_str())])
            .then_add_class(LIFT_SETTLE_MS, HOVERED_CLASS);

        match self.engine.run_if_idle(card.clone(), lift) {
            Ok(Some(_)) => {}
            Ok(None) => return false,
            Err(error) => {
                trace!(card = %card.id(), %error, "lift not started");
                return false;
            }
        }

        if let Some(icon) = card.query(ICON_SELECTOR) {
            let tilt = StagedAnimation::new("icon-tilt")
                .then_styles(0, &[("transform", "rotate(5deg) scale(1.1)")]);
            self.start(icon, tilt);
        }
        true
    }

    /// Restore `card` and its icon, superseding any lift in flight.
    pub fn on_leave(&self, card: &TargetRef) {
        let rest = StagedAnimation::new("card-rest")
            .then_styles(0, &[("transform", "translateY(0) scale(1)")])
            .then_remove_class(0, HOVERED_CLASS);
        self.start(card.clone(), rest);

        if let Some(icon) = card.query(ICON_SELECTOR) {
            let untilt = StagedAnimation::new("icon-rest")
                .then_styles(0, &[("transform", "rotate(0) scale(1)")]);
            self.start(icon, untilt);
        }
    }

    fn start(&self, target: TargetRef, animation: StagedAnimation) {
        let id = target.id();
        if let Err(error) = self.engine.run(target, animation) {
            trace!(target = %id, %error, "hover animation not started");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SceneError;
    use crate::host::headless::{Element, HeadlessHost};
    use crate::host::{ErrorSink, Target};
    use std::rc::Rc;

    struct NullSink;

    impl ErrorSink for NullSink {
        fn report_error(&self, _: &str, _: &SceneError) {}
    }

    fn setup() -> (HeadlessHost, FeatureCardHover, Rc<Element>, Rc<Element>) {
        let page = HeadlessHost::new();
        let engine = StagedAnimationEngine::new(page.host().scheduler, Rc::new(NullSink));
        let hover = FeatureCardHover::new(engine, HoverConfig::default());
        let icon = Element::new("i").with_class("feature-icon");
        let card = Element::new("div").with_class("feature-card").with_child(icon.clone());
        (page, hover, card, icon)
    }

    #[test]
    fn test_hover_lifts_card_and_icon() {
        let (page, hover, card, icon) = setup();
        let target: TargetRef = card.clone();

        assert!(hover.on_hover(&target));
        assert_eq!(
            card.style("transform").as_deref(),
            Some("translateY(-8px) scale(1.02)")
        );
        assert_eq!(icon.style("transform").as_deref(), Some("rotate(5deg) scale(1.1)"));
        assert!(!card.has_class(HOVERED_CLASS));

        page.advance(LIFT_SETTLE_MS);
        assert!(card.has_class(HOVERED_CLASS));
    }

    #[test]
    fn test_second_hover_while_animating_is_ignored() {
        let (page, hover, card, _) = setup();
        let target: TargetRef = card.clone();

        assert!(hover.on_hover(&target));
        let writes = card.style_writes();
        page.advance(100);
        assert!(!hover.on_hover(&target));
        assert_eq!(card.style_writes(), writes);

        page.advance(LIFT_SETTLE_MS);
        assert!(hover.on_hover(&target));
    }

    #[test]
    fn test_leave_supersedes_lift() {
        let (page, hover, card, icon) = setup();
        let target: TargetRef = card.clone();

        hover.on_hover(&target);
        page.advance(100);
        hover.on_leave(&target);
        page.advance(1_000);

        assert!(!card.has_class(HOVERED_CLASS));
        assert_eq!(card.style("transform").as_deref(), Some("translateY(0) scale(1)"));
        assert_eq!(icon.style("transform").as_deref(), Some("rotate(0) scale(1)"));
    }

    #[test]
    fn test_card_without_icon() {
        let (_page, hover, _, _) = setup();
        let bare: TargetRef = Element::new("div");
        assert!(hover.on_hover(&bare));
        hover.on_leave(&bare);
        assert_eq!(bare.style("transform").as_deref(), Some("translateY(0) scale(1)"));
    }
}
