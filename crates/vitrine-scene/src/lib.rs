//! Vitrine scene: the interactive layer of a product landing page.
//!
//! Components animate and validate page elements through a small set of host
//! capabilities ([`host`]). Every timed effect is a [`StagedAnimation`] run
//! by the shared [`StagedAnimationEngine`], which keeps at most one run per
//! element and isolates failing runs.
//!
//! ```text
//! PageEvent ──► EventRouter ──► ComponentRegistry ──► Rotator / PricingToggle /
//!                                                     FeatureCardHover / fields
//!                                                          │
//! VisibilityTrigger ──► ScrollReveal ──────────────────────┤
//!                                                          ▼
//!                                              StagedAnimationEngine ──► Target
//!                                                          │
//!                                                     MetricsSink (errors)
//! ```
//!
//! Everything runs on one thread; shared state uses `Rc`/`RefCell` and timer
//! callbacks hold weak references so dropped components go quiet.

pub mod animation;
pub mod components;
pub mod error;
pub mod host;
pub mod interaction;
pub mod metrics;
pub mod registry;
pub mod rotator;
pub mod router;
pub mod validation;
pub mod visibility;

pub use animation::{AnimationStep, RunEvent, RunHandle, StagedAnimation, StagedAnimationEngine};
pub use components::{BillingPeriod, FeatureCardHover, PricingToggle, ScrollReveal};
pub use error::{Result, SceneError};
pub use host::{Host, Target, TargetId, TargetRef};
pub use interaction::InteractionDebouncer;
pub use metrics::{MetricsSink, MetricsSnapshot};
pub use registry::{Component, ComponentKind, ComponentRegistry};
pub use rotator::{Rotator, RotatorMode};
pub use router::{EventRouter, PageEvent};
pub use validation::{ValidationVerdict, validate};
pub use visibility::VisibilityTrigger;
