//! The task that polls the change feed into the work queue.

use crate::config::CaptureConfig;
use crate::queue::BoundedWorkQueue;
use cdc_core::{sleep_or_stopped, ChangeFeed, ChangeRecord, Cursor, FeedError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Worker name of the producer task.
pub(crate) const PRODUCER: &str = "cdc-producer";

/// What the producer hands back when it exits.
#[derive(Debug)]
pub(crate) struct ProducerOutcome {
    pub records_seen: u64,
    pub last_cursor: Cursor,
    pub idle: Duration,
}

pub(crate) struct ChangeFeedProducer {
    pub feed: Arc<dyn ChangeFeed>,
    pub queue: Arc<BoundedWorkQueue<ChangeRecord>>,
    pub config: CaptureConfig,
    pub stop: CancellationToken,
}

impl ChangeFeedProducer {
    /// Poll the feed from `from` until stopped.
    ///
    /// The stop flag is checked once per query, so the records of the query
    /// in flight are always enqueued in full before the producer exits and
    /// the reported cursor never points into a half-consumed response. Feed
    /// errors end the producer.
    pub(crate) async fn run(self, from: Cursor) -> Result<ProducerOutcome, FeedError> {
        let mut cursor = from;
        let mut records_seen = 0u64;
        let mut idle = Duration::ZERO;

        info!(worker = PRODUCER, cursor = %cursor, "Producer started");

        while !self.stop.is_cancelled() {
            let records = self.feed.query(&cursor).await.inspect_err(|e| {
                error!(worker = PRODUCER, cursor = %cursor, "Feed query failed: {e}");
            })?;

            let count = records.len();
            for record in records {
                let next = record.cursor().clone();
                self.enqueue(record).await;
                cursor = next;
            }
            records_seen += count as u64;

            if count < self.config.full_batch {
                debug!(worker = PRODUCER, count, cursor = %cursor, "Feed caught up");
                let idle_start = Instant::now();
                let stopped = sleep_or_stopped(&self.stop, self.config.idle_interval).await;
                idle += idle_start.elapsed();
                if stopped {
                    break;
                }
            }
        }

        info!(
            worker = PRODUCER,
            records_seen,
            cursor = %cursor,
            idle_ms = idle.as_millis() as u64,
            "Producer stopped"
        );

        Ok(ProducerOutcome {
            records_seen,
            last_cursor: cursor,
            idle,
        })
    }

    /// Enqueue `record`, backing off while the queue is full.
    ///
    /// A stop request does not cut this short: consumers keep draining until
    /// the producer has joined, so the retry always completes.
    async fn enqueue(&self, record: ChangeRecord) {
        let mut pending = record;
        loop {
            match self.queue.offer(pending) {
                Ok(()) => return,
                Err(rejected) => {
                    warn!(
                        worker = PRODUCER,
                        queued = self.queue.len(),
                        "Queue busy, retrying in {:?}",
                        self.config.enqueue_backoff
                    );
                    tokio::time::sleep(self.config.enqueue_backoff).await;
                    pending = rejected;
                }
            }
        }
    }
}
