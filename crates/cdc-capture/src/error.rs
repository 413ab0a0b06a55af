//! Error types for the capture engines.

use cdc_core::FeedError;
use thiserror::Error;

/// Errors that can occur while starting or stopping a capture engine.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// `start` was called on an engine that is already running.
    #[error("Capture engine is already running")]
    AlreadyRunning,

    /// `stop` was called on an engine that was never started.
    #[error("Capture engine is not running")]
    NotRunning,

    /// A worker terminated with an unrecoverable feed error.
    #[error("Worker '{worker}' failed")]
    Worker {
        worker: String,
        #[source]
        source: FeedError,
    },

    /// A worker task panicked or was aborted.
    #[error("Worker '{worker}' panicked: {reason}")]
    Panicked { worker: String, reason: String },
}

impl CaptureError {
    pub(crate) fn joined(worker: &str, err: tokio::task::JoinError) -> Self {
        CaptureError::Panicked {
            worker: worker.to_string(),
            reason: err.to_string(),
        }
    }
}
