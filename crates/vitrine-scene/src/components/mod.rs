//! Page components built on the animation engine.
//!
//! - [`pricing`]: monthly/annual price swap
//! - [`feature_card`]: hover lift for feature cards
//! - [`reveal`]: scroll-triggered, staggered fade-in

pub mod feature_card;
pub mod pricing;
pub mod reveal;

pub use feature_card::FeatureCardHover;
pub use pricing::{BillingPeriod, PricingToggle};
pub use reveal::ScrollReveal;
