//! Queue-based capture engine.

use crate::client::CaptureClient;
use crate::config::CaptureConfig;
use crate::consumer::RecordConsumer;
use crate::error::CaptureError;
use crate::processor::{BusyWork, RecordProcessor};
use crate::producer::{ChangeFeedProducer, ProducerOutcome, PRODUCER};
use crate::queue::BoundedWorkQueue;
use async_trait::async_trait;
use cdc_core::{ChangeFeed, ChangeRecord, Cursor, FeedError, RunResult, WorkerStats};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Per-run state, created by `start` and consumed by `stop`.
struct ActiveRun {
    started: Instant,
    producer_stop: CancellationToken,
    consumer_stop: CancellationToken,
    producer: JoinHandle<Result<ProducerOutcome, FeedError>>,
    consumers: Vec<(String, JoinHandle<()>)>,
    results: Arc<Mutex<Vec<WorkerStats>>>,
}

/// Capture engine with one producer feeding a pool of consumers through a
/// [`BoundedWorkQueue`].
///
/// Feed errors are not retried here: a failing query ends the producer and
/// the error is reported by [`CaptureClient::stop`]. Use [`DirectCapture`]
/// against a backend that fails transiently.
///
/// [`DirectCapture`]: crate::DirectCapture
pub struct QueueCapture {
    feed: Arc<dyn ChangeFeed>,
    processor: Arc<dyn RecordProcessor>,
    config: CaptureConfig,
    queue: Arc<BoundedWorkQueue<ChangeRecord>>,
    run: Option<ActiveRun>,
}

impl QueueCapture {
    pub fn new(feed: Arc<dyn ChangeFeed>, config: CaptureConfig) -> Self {
        let queue = Arc::new(BoundedWorkQueue::new(config.queue_capacity));
        Self {
            feed,
            processor: Arc::new(BusyWork::default()),
            config,
            queue,
            run: None,
        }
    }

    /// Replace the per-record processing (defaults to [`BusyWork`]).
    pub fn with_processor(mut self, processor: Arc<dyn RecordProcessor>) -> Self {
        self.processor = processor;
        self
    }

    /// Records currently waiting in the work queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }
}

#[async_trait]
impl CaptureClient for QueueCapture {
    fn name(&self) -> &'static str {
        "queue"
    }

    async fn start(&mut self, from: Cursor) -> Result<(), CaptureError> {
        if self.run.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        let stale = self.queue.clear();
        if stale > 0 {
            debug!(stale, "Discarded records left over from a previous run");
        }

        info!(
            cursor = %from,
            consumers = self.config.consumers,
            capacity = self.queue.capacity(),
            "Starting queue-based capture"
        );

        let started = Instant::now();
        let producer_stop = CancellationToken::new();
        let consumer_stop = CancellationToken::new();
        let results = Arc::new(Mutex::new(Vec::with_capacity(self.config.consumers)));

        let producer = ChangeFeedProducer {
            feed: Arc::clone(&self.feed),
            queue: Arc::clone(&self.queue),
            config: self.config.clone(),
            stop: producer_stop.clone(),
        };
        let producer = tokio::spawn(producer.run(from));

        let consumers = (0..self.config.consumers)
            .map(|i| {
                let name = format!("cdc-consumer-{i}");
                let consumer = RecordConsumer {
                    name: name.clone(),
                    queue: Arc::clone(&self.queue),
                    processor: Arc::clone(&self.processor),
                    idle_interval: self.config.consumer_idle_interval,
                    stop: consumer_stop.clone(),
                    results: Arc::clone(&results),
                };
                (name, tokio::spawn(consumer.run()))
            })
            .collect();

        self.run = Some(ActiveRun {
            started,
            producer_stop,
            consumer_stop,
            producer,
            consumers,
            results,
        });
        Ok(())
    }

    async fn stop(&mut self) -> Result<RunResult, CaptureError> {
        let run = self.run.take().ok_or(CaptureError::NotRunning)?;

        // Producer first: consumers may only give up on an empty queue once
        // nothing more can be enqueued.
        run.producer_stop.cancel();
        let producer = run.producer.await;
        let producer_elapsed = run.started.elapsed();

        run.consumer_stop.cancel();
        let mut failure = None;
        for (name, handle) in run.consumers {
            if let Err(e) = handle.await {
                error!(worker = %name, "Consumer terminated abnormally: {e}");
                failure.get_or_insert(CaptureError::joined(&name, e));
            }
        }
        let duration = run.started.elapsed();

        let outcome = match producer {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(source)) => {
                return Err(CaptureError::Worker {
                    worker: PRODUCER.to_string(),
                    source,
                })
            }
            Err(e) => return Err(CaptureError::joined(PRODUCER, e)),
        };
        if let Some(failure) = failure {
            return Err(failure);
        }

        let workers = std::mem::take(
            &mut *run
                .results
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        let mut result =
            RunResult::aggregate(outcome.records_seen, outcome.last_cursor, duration, &workers);
        result.producer_duration_ms = Some(producer_elapsed.as_millis() as u64);

        info!(
            records_seen = result.records_seen,
            records_processed = result.records_processed,
            duration_ms = result.duration_ms,
            producer_ms = producer_elapsed.as_millis() as u64,
            producer_idle_ms = outcome.idle.as_millis() as u64,
            last_cursor = %result.last_cursor,
            "Queue-based capture stopped"
        );
        Ok(result)
    }
}
