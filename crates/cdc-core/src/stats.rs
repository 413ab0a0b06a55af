//! Run statistics shared by the capture engines and the load generator.
//!
//! Workers keep private [`WorkerStats`] while running and hand them over
//! exactly once when they exit. The final [`RunResult`] / [`LoadResult`] is
//! assembled after every worker has joined.

use crate::record::{ChangeRecord, Cursor};
use serde::Serialize;
use std::time::Duration;

/// Mean maintained incrementally, without keeping the history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollingAverage {
    mean: f64,
    count: u64,
}

impl RollingAverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one more value into the mean.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let n = self.count as f64;
        self.mean = self.mean * ((n - 1.0) / n) + value / n;
    }

    /// Combine with another average, weighting each side by its count.
    pub fn merge(&mut self, other: &RollingAverage) {
        let total = self.count + other.count;
        if total == 0 {
            return;
        }
        self.mean = (self.mean * self.count as f64 + other.mean * other.count as f64) / total as f64;
        self.count = total;
    }

    /// Current mean, 0 when no value was seen.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Private counters of one consumer worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    /// Worker name, used in logs.
    pub worker: String,
    /// Records this worker processed.
    pub processed: u64,
    /// Time spent sleeping on an empty queue.
    pub idle: Duration,
    /// Cursor of the last record this worker processed.
    pub last_cursor: Option<Cursor>,
    /// Sum of the serialized sizes of processed records.
    pub cumulative_size_bytes: u64,
    /// Rolling average of the per-record processing cost, in milliseconds.
    pub processing_ms: RollingAverage,
}

impl WorkerStats {
    pub fn new(worker: impl Into<String>) -> Self {
        Self {
            worker: worker.into(),
            ..Default::default()
        }
    }

    /// Account one processed record and what processing it cost.
    pub fn record(&mut self, record: &ChangeRecord, cost: Duration) {
        self.processed += 1;
        self.cumulative_size_bytes += record.size_bytes() as u64;
        self.last_cursor = Some(record.cursor().clone());
        self.processing_ms.update(cost.as_secs_f64() * 1000.0);
    }

    pub fn add_idle(&mut self, idle: Duration) {
        self.idle += idle;
    }
}

/// Average record size, defined as 0 when nothing was processed.
pub fn average_record_size(total_bytes: u64, records: u64) -> f64 {
    if records == 0 {
        0.0
    } else {
        total_bytes as f64 / records as f64
    }
}

fn per_second(count: u64, millis: u64) -> f64 {
    if millis == 0 {
        0.0
    } else {
        count as f64 / (millis as f64 / 1000.0)
    }
}

/// Outcome of one capture engine run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    /// Records returned by the feed.
    pub records_seen: u64,
    /// Records that went through per-record processing.
    pub records_processed: u64,
    /// Wall-clock time from start until every worker joined.
    pub duration_ms: u64,
    /// Last cursor the feed was consumed up to.
    pub last_cursor: Cursor,
    pub average_record_size_bytes: f64,
    /// Time from start until the producer joined (queue-based engine only).
    pub producer_duration_ms: Option<u64>,
    /// Total time consumers spent idle on an empty queue.
    pub consumer_idle_ms: u64,
    /// Count-weighted mean processing cost per record.
    pub average_processing_ms: f64,
    /// Feed queries that failed transiently and were retried.
    pub transient_failures: u64,
}

impl RunResult {
    /// Assemble a result from the frozen per-worker statistics.
    pub fn aggregate(
        records_seen: u64,
        last_cursor: Cursor,
        duration: Duration,
        workers: &[WorkerStats],
    ) -> Self {
        let mut processed = 0;
        let mut total_bytes = 0;
        let mut idle = Duration::ZERO;
        let mut processing = RollingAverage::new();
        for stats in workers {
            processed += stats.processed;
            total_bytes += stats.cumulative_size_bytes;
            idle += stats.idle;
            processing.merge(&stats.processing_ms);
        }

        RunResult {
            records_seen,
            records_processed: processed,
            duration_ms: duration.as_millis() as u64,
            last_cursor,
            average_record_size_bytes: average_record_size(total_bytes, processed),
            producer_duration_ms: None,
            consumer_idle_ms: idle.as_millis() as u64,
            average_processing_ms: processing.mean(),
            transient_failures: 0,
        }
    }

    /// Records seen per second of run time.
    pub fn download_rate(&self) -> f64 {
        per_second(self.records_seen, self.duration_ms)
    }

    /// Records processed per second of run time.
    pub fn process_rate(&self) -> f64 {
        per_second(self.records_processed, self.duration_ms)
    }
}

/// Outcome of one load generator run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadResult {
    pub total_changes: u64,
    pub average_worker_runtime_ms: f64,
    pub workers: usize,
    /// Requested changes per second across all workers.
    pub target_rate: f64,
}

impl LoadResult {
    pub fn new(total_changes: u64, worker_runtimes: &[Duration], target_rate: f64) -> Self {
        let average_worker_runtime_ms = if worker_runtimes.is_empty() {
            0.0
        } else {
            let total: f64 = worker_runtimes
                .iter()
                .map(|runtime| runtime.as_secs_f64() * 1000.0)
                .sum();
            total / worker_runtimes.len() as f64
        };

        LoadResult {
            total_changes,
            average_worker_runtime_ms,
            workers: worker_runtimes.len(),
            target_rate,
        }
    }

    /// Changes per second actually achieved.
    pub fn achieved_rate(&self) -> f64 {
        if self.average_worker_runtime_ms > 0.0 {
            self.total_changes as f64 / (self.average_worker_runtime_ms / 1000.0)
        } else {
            0.0
        }
    }
}
