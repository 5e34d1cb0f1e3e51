//! Monthly/annual pricing toggle.
//!
//! Every price card carries both prices as `data-monthly` and `data-annual`
//! attributes and shows the current one in its `.price-amount` element.
//! Switching the billing period runs a three-stage swap on each amount:
//! fade out, replace the text while offset, settle.

use std::cell::Cell;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vitrine_config::PricingConfig;

use crate::animation::{StagedAnimation, StagedAnimationEngine};
use crate::error::SceneError;
use crate::host::TargetRef;

pub const AMOUNT_SELECTOR: &str = ".price-amount";
const ACTIVE_CLASS: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    #[default]
    Monthly,
    Annual,
}

impl BillingPeriod {
    /// Attribute on a price card holding the price for this period.
    pub fn price_attribute(self) -> &'static str {
        match self {
            Self::Monthly => "data-monthly",
            Self::Annual => "data-annual",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Monthly => Self::Annual,
            Self::Annual => Self::Monthly,
        }
    }
}

pub struct PricingToggle {
    cards: Vec<TargetRef>,
    controls: Vec<(BillingPeriod, TargetRef)>,
    engine: StagedAnimationEngine,
    config: PricingConfig,
    period: Cell<BillingPeriod>,
}

impl PricingToggle {
    /// `controls` are the period buttons, each tagged with the period it
    /// selects. The page is assumed to render `initial` already.
    pub fn new(
        cards: Vec<TargetRef>,
        controls: Vec<(BillingPeriod, TargetRef)>,
        engine: StagedAnimationEngine,
        config: PricingConfig,
        initial: BillingPeriod,
    ) -> Self {
        let toggle = Self {
            cards,
            controls,
            engine,
            config,
            period: Cell::new(initial),
        };
        toggle.sync_controls();
        toggle
    }

    pub fn period(&self) -> BillingPeriod {
        self.period.get()
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Period selected by control `index`, if there is one.
    pub fn control_period(&self, index: usize) -> Option<BillingPeriod> {
        self.controls.get(index).map(|(period, _)| *period)
    }

    /// Switch to the other period.
    pub fn toggle(&self) -> usize {
        self.set_period(self.period().toggled())
    }

    /// Show `period` prices. Returns the number of cards whose swap started;
    /// selecting the current period does nothing and returns 0.
    pub fn set_period(&self, period: BillingPeriod) -> usize {
        if period == self.period() {
            debug!(?period, "billing period unchanged");
            return 0;
        }
        self.period.set(period);
        self.sync_controls();

        let swapped = self
            .cards
            .iter()
            .filter(|card| self.swap_price(card, period))
            .count();
        debug!(?period, swapped, cards = self.cards.len(), "billing period changed");
        swapped
    }

    fn swap_price(&self, card: &TargetRef, period: BillingPeriod) -> bool {
        let Some(amount) = card.query(AMOUNT_SELECTOR) else {
            let error = SceneError::MissingTarget(format!("{} in {}", AMOUNT_SELECTOR, card.id()));
            warn!(%error, "price card skipped");
            return false;
        };
        let Some(price) = card.attribute(period.price_attribute()) else {
            let error = SceneError::MissingAttribute {
                target: card.id(),
                attribute: period.price_attribute().to_string(),
            };
            warn!(%error, "price card skipped");
            return false;
        };

        let swap = StagedAnimation::new("price-swap")
            .then_styles(0, &[("opacity", "0"), ("transform", "translateY(-10px)")])
            .then(self.config.swap_delay_ms, move |target| {
                target.set_text(&price);
                target.set_style("transform", "translateY(10px)")
            })
            .then_styles(self.config.frame_ms, &[("opacity", "1"), ("transform", "translateY(0)")]);

        match self.engine.run(amount, swap) {
            Ok(_) => true,
            Err(error) => {
                warn!(card = %card.id(), %error, "price swap not started");
                false
            }
        }
    }

    fn sync_controls(&self) {
        let current = self.period();
        for (period, control) in &self.controls {
            let active = *period == current;
            if active {
                control.add_class(ACTIVE_CLASS);
            } else {
                control.remove_class(ACTIVE_CLASS);
            }
            control.set_attribute("aria-pressed", if active { "true" } else { "false" });
        }
    }
}
