//! Error types for the load generator.

use cdc_core::FeedError;
use thiserror::Error;

/// Errors that can occur while generating load.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Load generator is already running")]
    AlreadyRunning,

    #[error("Load generator is not running")]
    NotRunning,

    /// The requested rate cannot be split across the workers.
    #[error("Invalid target rate {rate} for {workers} workers")]
    InvalidRate { rate: f64, workers: usize },

    /// A worker's mutation failed.
    #[error("Worker '{worker}' failed")]
    Worker {
        worker: String,
        #[source]
        source: FeedError,
    },

    #[error("Worker '{worker}' panicked: {reason}")]
    Panicked { worker: String, reason: String },
}
