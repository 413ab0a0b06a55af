//! Integration tests for the capture engines against the in-memory backend.

use cdc_capture::{
    BusyWork, CaptureClient, CaptureConfig, CaptureError, DirectCapture, NoopProcessor,
    QueueCapture, RecordProcessor,
};
use cdc_core::{ChangeFeed, ChangeRecord, ChangeWriter, Cursor, FeedError, MemoryGraph};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn fast_config() -> CaptureConfig {
    CaptureConfig::default()
        .with_consumers(2)
        .with_idle_interval(Duration::from_millis(10))
        .with_consumer_idle_interval(Duration::from_millis(2))
        .with_enqueue_backoff(Duration::from_millis(1))
}

async fn graph_with_changes(count: usize) -> Arc<MemoryGraph> {
    let graph = Arc::new(MemoryGraph::new());
    if count > 0 {
        graph.create_tagged("label_id_0", count, "payload").await.unwrap();
    }
    graph
}

fn queue_capture(graph: &Arc<MemoryGraph>, config: CaptureConfig) -> QueueCapture {
    let feed: Arc<dyn ChangeFeed> = graph.clone();
    QueueCapture::new(feed, config).with_processor(Arc::new(NoopProcessor))
}

/// Records the cursor of every record it is handed.
#[derive(Default)]
struct RecordingProcessor {
    seen: Mutex<Vec<String>>,
}

impl RecordProcessor for RecordingProcessor {
    fn process(&self, record: &ChangeRecord) -> Duration {
        self.seen.lock().unwrap().push(record.id.to_string());
        Duration::ZERO
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_three_records_two_consumers() {
    let graph = graph_with_changes(3).await;
    let mut capture = queue_capture(&graph, fast_config());

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let result = capture.stop().await.unwrap();

    assert_eq!(result.records_seen, 3);
    assert_eq!(result.records_processed, 3);
    assert_eq!(result.last_cursor, Cursor::from("3"));
    assert!(result.average_record_size_bytes > 0.0);
    assert!(result.producer_duration_ms.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_records_yields_defined_result() {
    let graph = graph_with_changes(0).await;
    let mut capture = queue_capture(&graph, fast_config());

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let result = capture.stop().await.unwrap();

    assert_eq!(result.records_seen, 0);
    assert_eq!(result.records_processed, 0);
    assert_eq!(result.average_record_size_bytes, 0.0);
    assert_eq!(result.last_cursor, Cursor::from("0"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_record_processed_exactly_once() {
    let graph = graph_with_changes(2500).await;
    let recorder = Arc::new(RecordingProcessor::default());
    let feed: Arc<dyn ChangeFeed> = graph.clone();
    let mut capture = QueueCapture::new(feed, fast_config().with_consumers(4))
        .with_processor(recorder.clone());

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let result = capture.stop().await.unwrap();

    let seen = recorder.seen.lock().unwrap();
    let unique: HashSet<&String> = seen.iter().collect();
    assert_eq!(unique.len(), seen.len(), "a record was processed twice");
    assert_eq!(result.records_seen, 2500);
    assert_eq!(result.records_processed, seen.len() as u64);
    assert_eq!(result.records_processed, result.records_seen);
    assert_eq!(result.last_cursor, Cursor::from("2500"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_drain_on_stop_with_backpressure() {
    let graph = graph_with_changes(3000).await;
    let feed: Arc<dyn ChangeFeed> = graph.clone();
    let config = fast_config().with_queue_capacity(16);
    let mut capture =
        QueueCapture::new(feed, config).with_processor(Arc::new(BusyWork::new(8)));

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let result = capture.stop().await.unwrap();

    assert_eq!(result.records_processed, result.records_seen);
    assert_eq!(capture.queued(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_returns_promptly() {
    let graph = graph_with_changes(10).await;
    let config = fast_config()
        .with_idle_interval(Duration::from_millis(100))
        .with_consumer_idle_interval(Duration::from_millis(10));
    let mut capture = queue_capture(&graph, config);

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    let result = tokio::time::timeout(Duration::from_secs(5), capture.stop())
        .await
        .expect("stop did not return in time")
        .unwrap();

    assert_eq!(result.records_seen, result.records_processed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queue_engine_fails_fast_on_feed_error() {
    let graph = graph_with_changes(3).await;
    graph.fail_next_query(FeedError::Backend("connection reset".into()));
    let mut capture = queue_capture(&graph, fast_config());

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let err = capture.stop().await.unwrap_err();

    match err {
        CaptureError::Worker { worker, source } => {
            assert_eq!(worker, "cdc-producer");
            assert_eq!(source, FeedError::Backend("connection reset".into()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!capture.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queue_engine_does_not_retry_transient_errors() {
    let graph = graph_with_changes(3).await;
    graph.fail_next_query(FeedError::Transient("memory pool exhausted".into()));
    let mut capture = queue_capture(&graph, fast_config());

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(
        capture.stop().await,
        Err(CaptureError::Worker { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_start_and_stop_state_checks() {
    let graph = graph_with_changes(0).await;
    let mut capture = queue_capture(&graph, fast_config());

    assert!(matches!(capture.stop().await, Err(CaptureError::NotRunning)));

    capture.start(Cursor::from("0")).await.unwrap();
    assert!(matches!(
        capture.start(Cursor::from("0")).await,
        Err(CaptureError::AlreadyRunning)
    ));
    capture.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_engine_can_be_reused() {
    let graph = graph_with_changes(5).await;
    let mut capture = queue_capture(&graph, fast_config());

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let first = capture.stop().await.unwrap();
    assert_eq!(first.records_processed, 5);

    graph.create_tagged("label_id_1", 2, "payload").await.unwrap();
    capture.start(first.last_cursor.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = capture.stop().await.unwrap();

    assert_eq!(second.records_seen, 2);
    assert_eq!(second.records_processed, 2);
    assert_eq!(second.last_cursor, Cursor::from("7"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_direct_capture_retries_transient_failures() {
    let graph = graph_with_changes(3).await;
    graph.fail_next_query(FeedError::Transient("memory pool exhausted".into()));
    graph.fail_next_query(FeedError::Transient("memory pool exhausted".into()));
    let feed: Arc<dyn ChangeFeed> = graph.clone();
    let mut capture = DirectCapture::new(feed, fast_config());

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let result = capture.stop().await.unwrap();

    assert_eq!(result.transient_failures, 2);
    assert_eq!(result.records_seen, 3);
    assert_eq!(result.records_processed, 3);
    assert_eq!(result.last_cursor, Cursor::from("3"));
    assert!(result.producer_duration_ms.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_direct_capture_fails_on_backend_error() {
    let graph = graph_with_changes(3).await;
    graph.fail_next_query(FeedError::Backend("authentication failed".into()));
    let feed: Arc<dyn ChangeFeed> = graph.clone();
    let mut capture = DirectCapture::new(feed, fast_config());

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    match capture.stop().await {
        Err(CaptureError::Worker { worker, .. }) => assert_eq!(worker, "cdc-direct"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_direct_capture_follows_paged_feed() {
    let graph = Arc::new(MemoryGraph::new().with_page_size(100));
    graph.create_tagged("label_id_0", 450, "payload").await.unwrap();
    let feed: Arc<dyn ChangeFeed> = graph.clone();
    let mut capture = DirectCapture::new(feed, fast_config());

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let result = capture.stop().await.unwrap();

    assert_eq!(result.records_seen, 450);
    assert_eq!(result.last_cursor, Cursor::from("450"));
}

#[test]
fn test_stop_with_zero_consumer_idle_interval() {
    let (done_tx, done_rx) = std::sync::mpsc::channel();

    // As many consumers as worker threads: a consumer that never yields
    // would keep the producer from being polled.
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(async {
            let graph = graph_with_changes(3).await;
            let config = fast_config()
                .with_consumers(2)
                .with_consumer_idle_interval(Duration::ZERO);
            let mut capture = queue_capture(&graph, config);

            capture.start(Cursor::from("0")).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            capture.stop().await
        });
        let _ = done_tx.send(result.map(|r| (r.records_seen, r.records_processed)));
    });

    let (seen, processed) = done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("stop did not return with a zero consumer idle interval")
        .unwrap();
    assert_eq!(seen, 3);
    assert_eq!(processed, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queue_capture_pages_through_backlog_without_idling() {
    let graph = Arc::new(MemoryGraph::new().with_page_size(100));
    graph.create_tagged("label_id_0", 1000, "payload").await.unwrap();

    // Every page is exactly `full_batch` records, so the producer must not
    // pause between them; only the final empty query idles.
    let idle_interval = Duration::from_secs(5);
    let config = fast_config()
        .with_full_batch(100)
        .with_idle_interval(idle_interval);
    let mut capture = queue_capture(&graph, config);

    capture.start(Cursor::from("0")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let stop_started = Instant::now();
    let result = capture.stop().await.unwrap();
    let stop_elapsed = stop_started.elapsed();

    assert_eq!(result.records_seen, 1000);
    assert_eq!(result.records_processed, 1000);
    assert_eq!(result.last_cursor, Cursor::from("1000"));
    assert!(
        stop_elapsed < Duration::from_secs(1),
        "stop waited out the producer idle sleep: {stop_elapsed:?}"
    );
    assert!(result.duration_ms < idle_interval.as_millis() as u64);
}
