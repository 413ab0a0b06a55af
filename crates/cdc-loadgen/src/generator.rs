//! Worker pool producing changes at a target rate.

use crate::error::LoadError;
use crate::throttle::Throttle;
use cdc_core::{sleep_or_stopped, ChangeWriter, FeedError, LoadResult};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Load generator settings.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Number of worker tasks.
    pub workers: usize,
    /// Changes per batch: half creates, half deletes.
    pub batch_size: usize,
    /// Size of the payload attached to each created entity.
    pub payload_bytes: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            batch_size: 5000,
            payload_bytes: 32,
        }
    }
}

impl LoadConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the batch size; at least one create and one delete per batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(2);
        self
    }

    pub fn with_payload_bytes(mut self, payload_bytes: usize) -> Self {
        self.payload_bytes = payload_bytes;
        self
    }
}

/// Totals merged by each worker when it exits.
#[derive(Debug, Default)]
struct LoadTotals {
    changes: u64,
    runtimes: Vec<Duration>,
}

struct ActiveRun {
    stop: CancellationToken,
    target_rate: f64,
    workers: Vec<(String, JoinHandle<Result<(), FeedError>>)>,
    totals: Arc<Mutex<LoadTotals>>,
}

struct LoadWorker {
    index: usize,
    name: String,
    writer: Arc<dyn ChangeWriter>,
    batch_size: usize,
    payload_bytes: usize,
    duration: Duration,
    throttle: Throttle,
    stop: CancellationToken,
    totals: Arc<Mutex<LoadTotals>>,
}

fn random_payload(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

impl LoadWorker {
    async fn run(self) -> Result<(), FeedError> {
        let started = Instant::now();
        let tag = format!("label_id_{}", self.index);
        let creates = self.batch_size / 2;
        let per_batch = (creates * 2) as u64;
        let mut changes = 0u64;

        let outcome = loop {
            let payload = random_payload(self.payload_bytes);
            if let Err(e) = self.writer.create_tagged(&tag, creates, &payload).await {
                break Err(e);
            }
            if let Err(e) = self.writer.delete_tagged(&tag).await {
                break Err(e);
            }
            changes += per_batch;

            if let Some(delay) = self.throttle.required_delay(started.elapsed(), changes) {
                if sleep_or_stopped(&self.stop, delay).await {
                    break Ok(());
                }
            }
            if self.stop.is_cancelled() || started.elapsed() >= self.duration {
                break Ok(());
            }
        };

        let runtime = started.elapsed();
        match &outcome {
            Ok(()) => debug!(worker = %self.name, changes, runtime_ms = runtime.as_millis() as u64, "Load worker finished"),
            Err(e) => error!(worker = %self.name, changes, "Load worker failed: {e}"),
        }

        let mut totals = self
            .totals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        totals.changes += changes;
        totals.runtimes.push(runtime);
        outcome
    }
}

/// Pool of workers issuing create/delete batches at a target rate.
///
/// Each worker throttles itself to `target_rate / workers`; workers do not
/// coordinate, so the achieved total is the sum of the individual rates.
pub struct RateLimitedLoadGenerator {
    writer: Arc<dyn ChangeWriter>,
    config: LoadConfig,
    run: Option<ActiveRun>,
}

impl RateLimitedLoadGenerator {
    pub fn new(writer: Arc<dyn ChangeWriter>, config: LoadConfig) -> Self {
        Self {
            writer,
            config,
            run: None,
        }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Spawn the workers, each running for `duration` at its share of
    /// `target_rate` changes per second.
    pub fn start(&mut self, target_rate: f64, duration: Duration) -> Result<(), LoadError> {
        if self.run.is_some() {
            return Err(LoadError::AlreadyRunning);
        }
        let workers = self.config.workers;
        if workers == 0 || !target_rate.is_finite() || target_rate <= 0.0 {
            return Err(LoadError::InvalidRate {
                rate: target_rate,
                workers,
            });
        }

        let per_worker = target_rate / workers as f64;
        info!(
            target_rate,
            workers,
            per_worker,
            batch_size = self.config.batch_size,
            duration_ms = duration.as_millis() as u64,
            "Starting load generation"
        );

        let stop = CancellationToken::new();
        let totals = Arc::new(Mutex::new(LoadTotals::default()));
        let handles = (0..workers)
            .map(|i| {
                let name = format!("change-maker-{i}");
                let worker = LoadWorker {
                    index: i,
                    name: name.clone(),
                    writer: Arc::clone(&self.writer),
                    batch_size: self.config.batch_size,
                    payload_bytes: self.config.payload_bytes,
                    duration,
                    throttle: Throttle::per_second(per_worker),
                    stop: stop.clone(),
                    totals: Arc::clone(&totals),
                };
                (name, tokio::spawn(worker.run()))
            })
            .collect();

        self.run = Some(ActiveRun {
            stop,
            target_rate,
            workers: handles,
            totals,
        });
        Ok(())
    }

    /// Wait for the workers to reach their duration and collect the result.
    pub async fn wait(&mut self) -> Result<LoadResult, LoadError> {
        let run = self.run.take().ok_or(LoadError::NotRunning)?;
        Self::join(run).await
    }

    /// Signal the workers to stop now, join them and collect the result.
    pub async fn stop(&mut self) -> Result<LoadResult, LoadError> {
        let run = self.run.take().ok_or(LoadError::NotRunning)?;
        run.stop.cancel();
        Self::join(run).await
    }

    async fn join(run: ActiveRun) -> Result<LoadResult, LoadError> {
        let mut failure = None;
        for (name, handle) in run.workers {
            let err = match handle.await {
                Ok(Ok(())) => continue,
                Ok(Err(source)) => LoadError::Worker {
                    worker: name,
                    source,
                },
                Err(e) => LoadError::Panicked {
                    worker: name,
                    reason: e.to_string(),
                },
            };
            failure.get_or_insert(err);
        }
        if let Some(failure) = failure {
            return Err(failure);
        }

        let totals = std::mem::take(
            &mut *run
                .totals
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        let result = LoadResult::new(totals.changes, &totals.runtimes, run.target_rate);
        info!(
            total_changes = result.total_changes,
            avg_runtime_ms = result.average_worker_runtime_ms,
            achieved_rate = result.achieved_rate(),
            "Load generation finished"
        );
        Ok(result)
    }
}
