//! Change capture engines for cdc-stress.
//!
//! Two engines implement [`CaptureClient`]:
//!
//! - [`QueueCapture`] - one producer task polls the feed into a
//!   [`BoundedWorkQueue`] and a pool of consumer tasks drains it.
//! - [`DirectCapture`] - a single task polls the feed and consumes inline,
//!   retrying past transient feed failures.
//!
//! # Example
//!
//! ```ignore
//! use cdc_capture::{CaptureClient, CaptureConfig, QueueCapture};
//!
//! let mut capture = QueueCapture::new(feed, CaptureConfig::default());
//! capture.start(cursor).await?;
//! tokio::time::sleep(test_duration).await;
//! let result = capture.stop().await?;
//! ```

mod client;
mod config;
mod consumer;
mod direct;
mod engine;
mod error;
mod processor;
mod producer;
mod queue;

pub use client::CaptureClient;
pub use config::CaptureConfig;
pub use direct::DirectCapture;
pub use engine::QueueCapture;
pub use error::CaptureError;
pub use processor::{BusyWork, NoopProcessor, RecordProcessor, DEFAULT_BUSY_WORK_SCALE};
pub use queue::{BoundedWorkQueue, DEFAULT_QUEUE_CAPACITY};
