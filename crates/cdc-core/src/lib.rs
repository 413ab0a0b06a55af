//! Core types for the cdc-stress harness.
//!
//! This crate provides the foundational types shared by the capture engines,
//! the load generator and the backend adapters:
//!
//! - [`ChangeRecord`] / [`Cursor`] - one captured change and its feed position
//! - [`RollingAverage`], [`WorkerStats`], [`RunResult`], [`LoadResult`] - run statistics
//! - [`ChangeFeed`], [`ChangeWriter`], [`FeedControl`] - the backend boundary
//! - [`MemoryGraph`] - an in-process backend implementing all three
//!
//! # Architecture
//!
//! ```text
//! cdc-core (this crate)
//!    │
//!    ├─── cdc-capture   (queue-based and direct capture engines)
//!    ├─── cdc-loadgen   (rate limited change generation)
//!    └─── cdc-neo4j     (implements the backend traits over Bolt)
//! ```

pub mod error;
pub mod feed;
pub mod memory;
pub mod record;
pub mod stats;
pub mod stop;

pub use error::FeedError;
pub use feed::{ChangeFeed, ChangeWriter, FeedControl};
pub use memory::MemoryGraph;
pub use record::{ChangeRecord, Cursor};
pub use stats::{LoadResult, RollingAverage, RunResult, WorkerStats};
pub use stop::sleep_or_stopped;
