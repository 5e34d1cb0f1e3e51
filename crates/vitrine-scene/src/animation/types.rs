//! Core animation types.
//!
//! - `RunId`: Unique identifier for one execution of a staged animation
//! - `RunHandle`: What callers hold to cancel a run
//! - `RunState`: Lifecycle of a run
//! - `AnimationStep`: One (mutation, delay) pair

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::host::{Target, TargetId};

/// Unique identifier for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl RunId {
    /// Generate a new unique run ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by [`StagedAnimationEngine::run`](super::StagedAnimationEngine::run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunHandle {
    pub id: RunId,
    pub target: TargetId,
}

/// How a run ended, or that it hasn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Steps remain to be applied.
    Running,
    /// Every step was applied.
    Completed,
    /// Stopped by `cancel` or superseded by a newer run on the same target.
    Cancelled,
    /// A step's mutation failed; remaining steps were dropped.
    Failed,
}

type Mutation = Rc<dyn Fn(&dyn Target) -> Result<()>>;

/// One stage of a staged animation: wait `delay_ms` after the previous stage,
/// then apply the mutation.
#[derive(Clone)]
pub struct AnimationStep {
    /// Delay relative to the previous step (or to the start of the run).
    pub delay_ms: u64,
    mutate: Mutation,
}

impl AnimationStep {
    /// Step running an arbitrary mutation.
    pub fn new(delay_ms: u64, mutate: impl Fn(&dyn Target) -> Result<()> + 'static) -> Self {
        Self {
            delay_ms,
            mutate: Rc::new(mutate),
        }
    }

    /// Step writing a batch of inline style properties, in order.
    pub fn styles(delay_ms: u64, properties: &[(&str, &str)]) -> Self {
        let properties: Vec<(String, String)> = properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::new(delay_ms, move |target| {
            for (property, value) in &properties {
                target.set_style(property, value)?;
            }
            Ok(())
        })
    }

    pub fn add_class(delay_ms: u64, class: &str) -> Self {
        let class = class.to_string();
        Self::new(delay_ms, move |target| {
            target.add_class(&class);
            Ok(())
        })
    }

    pub fn remove_class(delay_ms: u64, class: &str) -> Self {
        let class = class.to_string();
        Self::new(delay_ms, move |target| {
            target.remove_class(&class);
            Ok(())
        })
    }

    /// Apply this step's mutation to `target`.
    pub fn apply(&self, target: &dyn Target) -> Result<()> {
        (self.mutate)(target)
    }
}

impl fmt::Debug for AnimationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationStep")
            .field("delay_ms", &self.delay_ms)
            .finish_non_exhaustive()
    }
}
