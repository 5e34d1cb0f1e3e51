//! Error types for the page runtime.

use thiserror::Error;

use crate::host::TargetId;

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;

/// Errors that can occur while driving page components.
///
/// None of these are fatal to the page: callers either log and skip, or
/// route them to an [`ErrorSink`](crate::host::ErrorSink).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// A referenced element is absent.
    #[error("missing target: {0}")]
    MissingTarget(String),

    /// A referenced attribute is absent on an element.
    #[error("target {target} has no `{attribute}` attribute")]
    MissingAttribute { target: TargetId, attribute: String },

    /// A call was rejected at the boundary.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The platform lacks a needed capability.
    #[error("unsupported capability: {0}")]
    Unsupported(&'static str),

    /// A mutation step failed while a run was in flight.
    #[error("mutation failed on {target}: {reason}")]
    Mutation { target: TargetId, reason: String },
}
