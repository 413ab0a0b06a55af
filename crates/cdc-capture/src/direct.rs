//! Capture without a queue: poll and consume on a single task.

use crate::client::CaptureClient;
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::processor::{NoopProcessor, RecordProcessor};
use async_trait::async_trait;
use cdc_core::{sleep_or_stopped, ChangeFeed, Cursor, FeedError, RunResult, WorkerStats};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const WORKER: &str = "cdc-direct";

struct DirectOutcome {
    stats: WorkerStats,
    last_cursor: Cursor,
    transient_failures: u64,
}

struct ActiveRun {
    started: Instant,
    stop: CancellationToken,
    handle: JoinHandle<Result<DirectOutcome, FeedError>>,
}

/// Single-task capture engine.
///
/// There is no queue and no backpressure: records are consumed inline as
/// each query returns. Transient feed failures are logged and the query is
/// retried from the last cursor that was fully consumed; any other feed
/// error ends the run.
pub struct DirectCapture {
    feed: Arc<dyn ChangeFeed>,
    processor: Arc<dyn RecordProcessor>,
    config: CaptureConfig,
    run: Option<ActiveRun>,
}

impl DirectCapture {
    pub fn new(feed: Arc<dyn ChangeFeed>, config: CaptureConfig) -> Self {
        Self {
            feed,
            processor: Arc::new(NoopProcessor),
            config,
            run: None,
        }
    }

    /// Replace the inline processing (defaults to [`NoopProcessor`]).
    pub fn with_processor(mut self, processor: Arc<dyn RecordProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }
}

async fn capture_loop(
    feed: Arc<dyn ChangeFeed>,
    processor: Arc<dyn RecordProcessor>,
    config: CaptureConfig,
    stop: CancellationToken,
    from: Cursor,
) -> Result<DirectOutcome, FeedError> {
    let mut cursor = from;
    let mut stats = WorkerStats::new(WORKER);
    let mut transient_failures = 0u64;

    while !stop.is_cancelled() {
        let records = match feed.query(&cursor).await {
            Ok(records) => records,
            Err(e) if e.is_transient() => {
                transient_failures += 1;
                warn!(worker = WORKER, cursor = %cursor, "Ignoring transient failure: {e}");
                if sleep_or_stopped(&stop, config.idle_interval).await {
                    break;
                }
                continue;
            }
            Err(e) => {
                error!(worker = WORKER, cursor = %cursor, "Feed query failed: {e}");
                return Err(e);
            }
        };

        let count = records.len();
        for record in &records {
            let cost = processor.process(record);
            stats.record(record, cost);
            cursor = record.cursor().clone();
        }

        if count < config.full_batch {
            let idle_start = Instant::now();
            let stopped = sleep_or_stopped(&stop, config.idle_interval).await;
            stats.add_idle(idle_start.elapsed());
            if stopped {
                break;
            }
        }
    }

    Ok(DirectOutcome {
        stats,
        last_cursor: cursor,
        transient_failures,
    })
}

#[async_trait]
impl CaptureClient for DirectCapture {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn start(&mut self, from: Cursor) -> Result<(), CaptureError> {
        if self.run.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        info!(cursor = %from, "Starting direct capture");

        let stop = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(
            Arc::clone(&self.feed),
            Arc::clone(&self.processor),
            self.config.clone(),
            stop.clone(),
            from,
        ));

        self.run = Some(ActiveRun {
            started: Instant::now(),
            stop,
            handle,
        });
        Ok(())
    }

    async fn stop(&mut self) -> Result<RunResult, CaptureError> {
        let run = self.run.take().ok_or(CaptureError::NotRunning)?;

        run.stop.cancel();
        let outcome = match run.handle.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(source)) => {
                return Err(CaptureError::Worker {
                    worker: WORKER.to_string(),
                    source,
                })
            }
            Err(e) => return Err(CaptureError::joined(WORKER, e)),
        };
        let duration = run.started.elapsed();

        let seen = outcome.stats.processed;
        let mut result =
            RunResult::aggregate(seen, outcome.last_cursor, duration, &[outcome.stats]);
        result.transient_failures = outcome.transient_failures;

        info!(
            records_seen = result.records_seen,
            duration_ms = result.duration_ms,
            transient_failures = result.transient_failures,
            last_cursor = %result.last_cursor,
            "Direct capture stopped"
        );
        Ok(result)
    }
}
