//! Consumer tasks draining the work queue.

use crate::processor::RecordProcessor;
use crate::queue::BoundedWorkQueue;
use cdc_core::{sleep_or_stopped, ChangeRecord, WorkerStats};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Records processed between voluntary yields to the scheduler.
const YIELD_EVERY: u64 = 64;

pub(crate) struct RecordConsumer {
    pub name: String,
    pub queue: Arc<BoundedWorkQueue<ChangeRecord>>,
    pub processor: Arc<dyn RecordProcessor>,
    pub idle_interval: Duration,
    pub stop: CancellationToken,
    pub results: Arc<Mutex<Vec<WorkerStats>>>,
}

impl RecordConsumer {
    /// Drain the queue until stopped and the queue is empty, then merge the
    /// private statistics into the shared results exactly once.
    pub(crate) async fn run(self) {
        let mut stats = WorkerStats::new(&self.name);

        loop {
            // The stop flag is raised only after the producer has joined, so
            // an empty poll that follows an observed stop means fully drained.
            let stopping = self.stop.is_cancelled();
            match self.queue.poll() {
                Some(record) => {
                    let cost = self.processor.process(&record);
                    stats.record(&record, cost);
                    if stats.processed % YIELD_EVERY == 0 {
                        tokio::task::yield_now().await;
                    }
                }
                None if stopping => break,
                None => {
                    let idle_start = Instant::now();
                    sleep_or_stopped(&self.stop, self.idle_interval).await;
                    stats.add_idle(idle_start.elapsed());
                }
            }
        }

        debug!(
            worker = %self.name,
            processed = stats.processed,
            idle_ms = stats.idle.as_millis() as u64,
            last_cursor = ?stats.last_cursor,
            avg_processing_ms = stats.processing_ms.mean(),
            "Consumer stopped"
        );

        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(stats);
    }
}
