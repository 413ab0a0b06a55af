//! Common interface of the capture engines.

use crate::error::CaptureError;
use async_trait::async_trait;
use cdc_core::{Cursor, RunResult};

/// A change capture engine that can be started from a cursor and stopped
/// to collect its statistics.
#[async_trait]
pub trait CaptureClient: Send {
    /// Short engine name for logs and reports.
    fn name(&self) -> &'static str;

    /// Start capturing changes after `from`.
    ///
    /// Discards all state from a previous run.
    async fn start(&mut self, from: Cursor) -> Result<(), CaptureError>;

    /// Signal every worker to stop, join them and assemble the run result.
    ///
    /// Workers are always joined, even when one of them failed; the first
    /// failure is returned after that.
    async fn stop(&mut self) -> Result<RunResult, CaptureError>;
}
