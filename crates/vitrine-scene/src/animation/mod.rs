//! Staged animations for page components.
//!
//! This module provides:
//! - **Steps**: (mutation, delay) pairs applied to one target
//! - **Staged animations**: named, ordered step sequences
//! - **Engine**: executes sequences through the host scheduler, one run per
//!   target, with cancellation and failure isolation
//! - **Run events**: lifecycle notifications for started, completed,
//!   cancelled and failed runs
//!
//! # Architecture
//!
//! ```text
//! StagedAnimationEngine
//!   ├── Active runs (run id → target, steps, cursor, pending timer)
//!   ├── Busy index (target id → run id)
//!   └── Event queue
//! ```

pub mod engine;
pub mod events;
pub mod sequence;
pub mod types;

pub use engine::StagedAnimationEngine;
pub use events::{EventQueue, RunEvent};
pub use sequence::StagedAnimation;
pub use types::{AnimationStep, RunHandle, RunId, RunState};
