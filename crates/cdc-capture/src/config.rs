//! Capture engine configuration.

use crate::queue::DEFAULT_QUEUE_CAPACITY;
use std::time::Duration;

/// Tuning knobs shared by both capture engines.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Number of consumer tasks (queue-based engine only).
    pub consumers: usize,
    /// Work queue capacity (queue-based engine only).
    pub queue_capacity: usize,
    /// A query returning fewer records than this means the feed is caught up.
    pub full_batch: usize,
    /// Pause after a caught-up query.
    pub idle_interval: Duration,
    /// Pause of a consumer that found the queue empty.
    pub consumer_idle_interval: Duration,
    /// Pause before retrying an enqueue on a full queue.
    pub enqueue_backoff: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            consumers: 4,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            full_batch: 100,
            idle_interval: Duration::from_millis(100),
            consumer_idle_interval: Duration::from_millis(10),
            enqueue_backoff: Duration::from_millis(100),
        }
    }
}

impl CaptureConfig {
    pub fn with_consumers(mut self, consumers: usize) -> Self {
        self.consumers = consumers.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_full_batch(mut self, full_batch: usize) -> Self {
        self.full_batch = full_batch;
        self
    }

    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    pub fn with_consumer_idle_interval(mut self, interval: Duration) -> Self {
        self.consumer_idle_interval = interval;
        self
    }

    pub fn with_enqueue_backoff(mut self, backoff: Duration) -> Self {
        self.enqueue_backoff = backoff;
        self
    }
}
