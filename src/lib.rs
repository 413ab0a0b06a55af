//! cdc-stress library
//!
//! Measures how much change throughput a change data capture pipeline can
//! sustain. Each measurement point resets the backend, starts a capture
//! engine at the current change cursor, drives a rate limited load generator
//! for a fixed window and reports what was written next to what was captured.
//!
//! # CLI Usage
//!
//! ```bash
//! # Sweep 5K..30K changes/sec against Neo4j with the queue-based engine
//! cdc-stress sweep --neo4j-uri bolt://localhost:7687 --neo4j-password secret
//!
//! # Single point against the in-memory backend with direct capture
//! cdc-stress once --rate 2000 --backend memory --capture direct --test-duration 5s
//! ```

use cdc_capture::{
    BusyWork, CaptureConfig, NoopProcessor, RecordProcessor, DEFAULT_BUSY_WORK_SCALE,
    DEFAULT_QUEUE_CAPACITY,
};
use cdc_loadgen::LoadConfig;
use clap::{Args, ValueEnum};
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod orchestrator;
pub mod report;

pub use config::parse_duration;
pub use orchestrator::{Observation, RatePlan, StressConfig, StressOrchestrator};

/// Where changes are written and read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Neo4j,
    /// In-process change log, useful to measure harness overhead.
    Memory,
}

/// Which capture engine consumes the feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CaptureKind {
    /// Producer task feeding a pool of consumers through a bounded queue.
    Queue,
    /// Single task querying and processing inline.
    Direct,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProcessorKind {
    /// Fixed CPU-bound work per record.
    Busy,
    Noop,
}

/// Capture engine tuning.
#[derive(Args, Clone, Debug)]
pub struct CaptureOpts {
    /// Capture engine
    #[arg(long, value_enum, default_value = "queue")]
    pub capture: CaptureKind,

    /// Number of consumer tasks (queue engine)
    #[arg(long, default_value = "4")]
    pub consumers: usize,

    /// Work queue capacity (queue engine)
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Batches smaller than this make the producer idle before re-polling
    #[arg(long, default_value = "100")]
    pub full_batch: usize,

    /// Sleep after a short or failed feed query
    #[arg(long, default_value = "100ms", value_parser = parse_duration)]
    pub idle_interval: Duration,

    /// Consumer sleep on an empty queue
    #[arg(long, default_value = "10ms", value_parser = parse_duration)]
    pub consumer_idle_interval: Duration,

    /// Producer backoff when the queue is full
    #[arg(long, default_value = "100ms", value_parser = parse_duration)]
    pub enqueue_backoff: Duration,

    /// Per-record processing
    #[arg(long, value_enum, default_value = "busy")]
    pub processor: ProcessorKind,

    /// Loop scale of the busy processor (scale^3 iterations per record)
    #[arg(long, default_value_t = DEFAULT_BUSY_WORK_SCALE)]
    pub busy_work_scale: u32,
}

impl CaptureOpts {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig::default()
            .with_consumers(self.consumers)
            .with_queue_capacity(self.queue_capacity)
            .with_full_batch(self.full_batch)
            .with_idle_interval(self.idle_interval)
            .with_consumer_idle_interval(self.consumer_idle_interval)
            .with_enqueue_backoff(self.enqueue_backoff)
    }

    pub fn processor(&self) -> Arc<dyn RecordProcessor> {
        match self.processor {
            ProcessorKind::Busy => Arc::new(BusyWork::new(self.busy_work_scale)),
            ProcessorKind::Noop => Arc::new(NoopProcessor),
        }
    }
}

/// Load generator tuning.
#[derive(Args, Clone, Debug)]
pub struct LoadOpts {
    /// Number of load generator workers
    #[arg(long, default_value = "10")]
    pub generator_workers: usize,

    /// Changes per batch (half creates, half deletes)
    #[arg(long, default_value = "5000")]
    pub batch_size: usize,

    /// Payload size per created node
    #[arg(long, default_value = "32")]
    pub payload_bytes: usize,
}

impl LoadOpts {
    pub fn load_config(&self) -> LoadConfig {
        LoadConfig::default()
            .with_workers(self.generator_workers)
            .with_batch_size(self.batch_size)
            .with_payload_bytes(self.payload_bytes)
    }
}

/// Timing of each measurement point.
#[derive(Args, Clone, Debug)]
pub struct TimingOpts {
    /// Load window per point
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub test_duration: Duration,

    /// Wait between the baseline reset and reading the start cursor
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub settle_time: Duration,
}

impl From<&TimingOpts> for StressConfig {
    fn from(opts: &TimingOpts) -> Self {
        StressConfig {
            test_duration: opts.test_duration,
            settle_time: opts.settle_time,
        }
    }
}
