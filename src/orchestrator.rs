//! Measurement points and rate sweeps.

use anyhow::Context;
use cdc_capture::CaptureClient;
use cdc_core::{FeedControl, LoadResult, RunResult};
use cdc_loadgen::RateLimitedLoadGenerator;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Target rates visited by a sweep: `start, start + step, ...` up to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePlan {
    start: u64,
    step: u64,
    end: u64,
}

impl RatePlan {
    pub fn new(start: u64, step: u64, end: u64) -> anyhow::Result<Self> {
        if start == 0 {
            anyhow::bail!("Rate start must be greater than zero");
        }
        if step == 0 {
            anyhow::bail!("Rate step must be greater than zero");
        }
        if start > end {
            anyhow::bail!("Rate start {start} is greater than rate end {end}");
        }
        Ok(Self { start, step, end })
    }

    pub fn rates(&self) -> impl Iterator<Item = u64> {
        (self.start..=self.end).step_by(self.step as usize)
    }
}

/// Timing of each measurement point.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// How long load is generated per point.
    pub test_duration: Duration,
    /// Pause between the baseline reset and reading the start cursor.
    pub settle_time: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            test_duration: Duration::from_secs(10),
            settle_time: Duration::from_secs(1),
        }
    }
}

/// One measurement point: what was written and what was captured.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub target_rate: u64,
    pub test_duration_ms: u64,
    pub capture_engine: &'static str,
    pub load: LoadResult,
    pub capture: RunResult,
}

/// Drives a capture engine and a load generator through measurement points.
pub struct StressOrchestrator {
    control: Arc<dyn FeedControl>,
    capture: Box<dyn CaptureClient>,
    generator: RateLimitedLoadGenerator,
    config: StressConfig,
}

impl StressOrchestrator {
    pub fn new(
        control: Arc<dyn FeedControl>,
        capture: Box<dyn CaptureClient>,
        generator: RateLimitedLoadGenerator,
        config: StressConfig,
    ) -> Self {
        Self {
            control,
            capture,
            generator,
            config,
        }
    }

    /// Run a single measurement point at `rate` changes per second.
    ///
    /// The load generator is stopped before the capture engine, so writes
    /// issued after the window do not stretch the capture duration and the
    /// engine drains everything that was produced.
    pub async fn measure(&mut self, rate: u64) -> anyhow::Result<Observation> {
        self.control
            .reset_all()
            .await
            .context("Failed to reset backend to baseline")?;
        tokio::time::sleep(self.config.settle_time).await;
        let from = self
            .control
            .current_cursor()
            .await
            .context("Failed to read current change cursor")?;

        info!(rate, from = %from, engine = self.capture.name(), "Starting measurement point");
        self.capture
            .start(from)
            .await
            .context("Failed to start capture engine")?;
        if let Err(e) = self.generator.start(rate as f64, self.config.test_duration) {
            if let Err(stop_err) = self.capture.stop().await {
                warn!("Capture engine failed while aborting point: {stop_err}");
            }
            return Err(e).context("Failed to start load generator");
        }

        tokio::time::sleep(self.config.test_duration).await;

        let load = self.generator.stop().await;
        let capture = self.capture.stop().await;
        let load = load.context("Load generation failed")?;
        let capture = capture.with_context(|| format!("{} capture failed", self.capture.name()))?;

        info!(
            rate,
            total_changes = load.total_changes,
            records_seen = capture.records_seen,
            records_processed = capture.records_processed,
            "Measurement point complete"
        );
        Ok(Observation {
            target_rate: rate,
            test_duration_ms: self.config.test_duration.as_millis() as u64,
            capture_engine: self.capture.name(),
            load,
            capture,
        })
    }

    /// Run every point of `plan` in order, handing each observation to
    /// `on_point` as soon as it completes. A worker error aborts the sweep.
    pub async fn sweep<F>(&mut self, plan: &RatePlan, mut on_point: F) -> anyhow::Result<Vec<Observation>>
    where
        F: FnMut(&Observation),
    {
        let mut observations = Vec::new();
        for rate in plan.rates() {
            let observation = self
                .measure(rate)
                .await
                .with_context(|| format!("Measurement at {rate} ch/s failed"))?;
            on_point(&observation);
            observations.push(observation);
        }
        Ok(observations)
    }
}
