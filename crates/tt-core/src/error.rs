//! Errors surfaced by the tracker core.

use thiserror::Error;

use crate::session::{SessionState, Transition};
use crate::types::ActivityName;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A durable read or write against a store failed.
///
/// Fatal to the in-flight operation. The core never retries on its own.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PersistenceError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl PersistenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors returned by catalog and session operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The activity name is already known.
    #[error("activity \"{0}\" already exists, pick another name")]
    DuplicateName(ActivityName),

    /// A transition was requested in a state that forbids it.
    #[error("cannot {action}: {reason}")]
    InvalidState {
        action: Transition,
        state: SessionState,
        reason: &'static str,
    },

    /// The store rejected a read or write.
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
}

impl TrackerError {
    pub const fn is_duplicate_name(&self) -> bool {
        matches!(self, Self::DuplicateName(_))
    }

    pub const fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}
