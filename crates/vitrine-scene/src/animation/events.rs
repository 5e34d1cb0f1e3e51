//! Run lifecycle events.
//!
//! The engine pushes an event whenever a run starts, completes, is cancelled
//! or fails. Events can be drained after any batch of timer callbacks.
//!
//! # Usage
//!
//! ```ignore
//! engine.run(card.clone(), hover_in)?;
//! page.advance(500);
//!
//! for event in engine.drain_events() {
//!     if let RunEvent::Completed { name, .. } = event {
//!         println!("{} finished", name);
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::types::{RunId, RunState};
use crate::host::TargetId;

/// Oldest events are dropped past this many undrained entries.
pub const MAX_PENDING_EVENTS: usize = 512;

/// Event emitted when a run changes state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Run was accepted and its first step is pending or applied.
    Started {
        run_id: RunId,
        target: TargetId,
        name: String,
    },
    /// Every step was applied.
    Completed {
        run_id: RunId,
        target: TargetId,
        name: String,
    },
    /// Run was cancelled or superseded before its last step.
    Cancelled {
        run_id: RunId,
        target: TargetId,
        name: String,
        /// Number of steps applied before cancellation.
        applied: usize,
    },
    /// A step failed; remaining steps were dropped.
    Failed {
        run_id: RunId,
        target: TargetId,
        name: String,
        /// Index of the failing step.
        step: usize,
        error: String,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            Self::Started { run_id, .. }
            | Self::Completed { run_id, .. }
            | Self::Cancelled { run_id, .. }
            | Self::Failed { run_id, .. } => *run_id,
        }
    }

    pub fn target(&self) -> TargetId {
        match self {
            Self::Started { target, .. }
            | Self::Completed { target, .. }
            | Self::Cancelled { target, .. }
            | Self::Failed { target, .. } => *target,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Started { name, .. }
            | Self::Completed { name, .. }
            | Self::Cancelled { name, .. }
            | Self::Failed { name, .. } => name,
        }
    }

    /// The state this event moves the run into.
    pub fn state(&self) -> RunState {
        match self {
            Self::Started { .. } => RunState::Running,
            Self::Completed { .. } => RunState::Completed,
            Self::Cancelled { .. } => RunState::Cancelled,
            Self::Failed { .. } => RunState::Failed,
        }
    }
}

/// Bounded FIFO of run events.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<RunEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: RunEvent) {
        if self.events.len() == MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = RunEvent> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events_for_target(&self, target: TargetId) -> Vec<&RunEvent> {
        self.events.iter().filter(|e| e.target() == target).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
