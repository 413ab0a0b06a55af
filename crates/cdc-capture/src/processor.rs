//! Per-record processing capability.
//!
//! Consumers hand every record to a [`RecordProcessor`], which stands in for
//! downstream business logic and reports what the work cost.

use cdc_core::ChangeRecord;
use std::hint::black_box;
use std::time::{Duration, Instant};

/// Default edge length of the [`BusyWork`] loop.
pub const DEFAULT_BUSY_WORK_SCALE: u32 = 30;

/// Work performed on every consumed record.
pub trait RecordProcessor: Send + Sync {
    /// Process `record`, returning the cost of doing so.
    fn process(&self, record: &ChangeRecord) -> Duration;
}

/// Deliberately CPU-bound processing with a fixed shape.
///
/// Runs a `scale^3` integer loop regardless of the record contents, so the
/// cost per record is the same across runs.
#[derive(Debug, Clone, Copy)]
pub struct BusyWork {
    scale: u32,
}

impl BusyWork {
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }
}

impl Default for BusyWork {
    fn default() -> Self {
        Self::new(DEFAULT_BUSY_WORK_SCALE)
    }
}

impl RecordProcessor for BusyWork {
    fn process(&self, _record: &ChangeRecord) -> Duration {
        let start = Instant::now();
        let mut sum: u64 = 0;
        for i in 1..self.scale as u64 {
            for j in 1..self.scale as u64 {
                for k in 1..self.scale as u64 {
                    sum = sum.wrapping_add(black_box(i * j) / k);
                }
            }
        }
        black_box(sum);
        start.elapsed()
    }
}

/// Processing that costs nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProcessor;

impl RecordProcessor for NoopProcessor {
    fn process(&self, _record: &ChangeRecord) -> Duration {
        Duration::ZERO
    }
}
