//! Error types for change feed backends.

use thiserror::Error;

/// Errors returned by the backend collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The backend rejected the call for a reason expected to clear on retry
    /// (e.g. memory pressure or a leader switch).
    #[error("Transient backend failure: {0}")]
    Transient(String),

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The cursor was not understood by the backend.
    #[error("Invalid cursor '{0}'")]
    InvalidCursor(String),
}

impl FeedError {
    /// Whether a retry of the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::Transient(_))
    }
}
