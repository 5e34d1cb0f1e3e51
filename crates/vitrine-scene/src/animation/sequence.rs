//! Staged animation definitions.
//!
//! A `StagedAnimation` is an ordered list of [`AnimationStep`]s with a name
//! used in logs and run events. Delays are sequential: each step waits its
//! delay after the previous step was applied.
//!
//! # Example
//!
//! ```ignore
//! let fade_in = StagedAnimation::new("fade-in")
//!     .then_styles(0, &[("opacity", "0"), ("transform", "translateY(30px)")])
//!     .then_styles(16, &[("opacity", "1"), ("transform", "translateY(0)")]);
//! assert_eq!(fade_in.total_delay_ms(), 16);
//! ```

use super::types::AnimationStep;
use crate::error::Result;
use crate::host::Target;

/// A named, ordered sequence of steps. Immutable once handed to the engine.
#[derive(Debug, Clone)]
pub struct StagedAnimation {
    pub name: String,
    steps: Vec<AnimationStep>,
}

impl StagedAnimation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a prebuilt step.
    pub fn step(mut self, step: AnimationStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a step running an arbitrary mutation.
    pub fn then(
        self,
        delay_ms: u64,
        mutate: impl Fn(&dyn Target) -> Result<()> + 'static,
    ) -> Self {
        self.step(AnimationStep::new(delay_ms, mutate))
    }

    /// Append a step writing inline style properties.
    pub fn then_styles(self, delay_ms: u64, properties: &[(&str, &str)]) -> Self {
        self.step(AnimationStep::styles(delay_ms, properties))
    }

    pub fn then_add_class(self, delay_ms: u64, class: &str) -> Self {
        self.step(AnimationStep::add_class(delay_ms, class))
    }

    pub fn then_remove_class(self, delay_ms: u64, class: &str) -> Self {
        self.step(AnimationStep::remove_class(delay_ms, class))
    }

    pub fn steps(&self) -> &[AnimationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of all step delays: the minimum time a full run takes.
    pub fn total_delay_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.delay_ms).sum()
    }
}
