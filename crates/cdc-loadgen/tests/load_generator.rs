//! Integration tests for the rate limited load generator.

use async_trait::async_trait;
use cdc_core::{ChangeWriter, FeedError, MemoryGraph};
use cdc_loadgen::{LoadConfig, LoadError, RateLimitedLoadGenerator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn small_config(workers: usize) -> LoadConfig {
    LoadConfig::default()
        .with_workers(workers)
        .with_batch_size(10)
        .with_payload_bytes(8)
}

/// Rejects every mutation after the first `allowed` calls.
struct FailingWriter {
    allowed: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl ChangeWriter for FailingWriter {
    async fn create_tagged(&self, _tag: &str, _count: usize, _payload: &str) -> Result<(), FeedError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(FeedError::Backend("write rejected".to_string()));
        }
        Ok(())
    }

    async fn delete_tagged(&self, _tag: &str) -> Result<(), FeedError> {
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rate_is_limited_to_target() {
    let graph = Arc::new(MemoryGraph::new());
    let mut generator = RateLimitedLoadGenerator::new(graph.clone(), small_config(2));

    generator.start(200.0, Duration::from_secs(1)).unwrap();
    let result = generator.wait().await.unwrap();

    assert_eq!(result.workers, 2);
    assert!(
        (160..=240).contains(&result.total_changes),
        "expected about 200 changes, got {}",
        result.total_changes
    );
    assert!(result.average_worker_runtime_ms >= 900.0);
    assert_eq!(graph.change_count() as u64, result.total_changes);
    assert_eq!(graph.node_count("label_id_0"), 0);
    assert_eq!(graph.node_count("label_id_1"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_interrupts_throttle_sleep() {
    let graph = Arc::new(MemoryGraph::new());
    let mut generator = RateLimitedLoadGenerator::new(graph, small_config(2));

    // 1 change per second per worker: the first batch puts each worker
    // seconds ahead of schedule.
    generator.start(2.0, Duration::from_secs(60)).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let result = generator.stop().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(result.total_changes, 20);
    assert!(!generator.is_running());
}

#[tokio::test]
async fn test_invalid_rate_rejected() {
    let graph = Arc::new(MemoryGraph::new());
    let mut generator = RateLimitedLoadGenerator::new(graph, small_config(2));

    for rate in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        let err = generator.start(rate, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRate { workers: 2, .. }));
    }
    assert!(!generator.is_running());
}

#[tokio::test]
async fn test_state_errors() {
    let graph = Arc::new(MemoryGraph::new());
    let mut generator = RateLimitedLoadGenerator::new(graph, small_config(1));

    assert!(matches!(generator.stop().await, Err(LoadError::NotRunning)));
    assert!(matches!(generator.wait().await, Err(LoadError::NotRunning)));

    generator.start(100.0, Duration::from_millis(50)).unwrap();
    assert!(matches!(
        generator.start(100.0, Duration::from_millis(50)),
        Err(LoadError::AlreadyRunning)
    ));
    generator.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_writer_failure_names_worker() {
    let writer = Arc::new(FailingWriter {
        allowed: 0,
        calls: AtomicUsize::new(0),
    });
    let mut generator = RateLimitedLoadGenerator::new(writer, small_config(1));

    generator.start(1000.0, Duration::from_secs(5)).unwrap();
    let err = generator.wait().await.unwrap_err();

    match err {
        LoadError::Worker { worker, source } => {
            assert_eq!(worker, "change-maker-0");
            assert_eq!(source, FeedError::Backend("write rejected".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}
