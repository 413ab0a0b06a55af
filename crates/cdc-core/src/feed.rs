//! Boundary traits for the system under test.
//!
//! The harness never talks to a database directly. Capture engines poll a
//! [`ChangeFeed`], load workers mutate through a [`ChangeWriter`] and the
//! orchestrator resets state through [`FeedControl`].

use crate::error::FeedError;
use crate::record::{ChangeRecord, Cursor};
use async_trait::async_trait;

/// A pollable stream of changes.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Return the changes strictly after `cursor`, in feed order.
    ///
    /// An empty vector means the caller has caught up.
    async fn query(&self, cursor: &Cursor) -> Result<Vec<ChangeRecord>, FeedError>;
}

/// Batched mutations used to generate changes.
#[async_trait]
pub trait ChangeWriter: Send + Sync {
    /// Create `count` entities tagged with `tag`, each carrying `payload`.
    async fn create_tagged(&self, tag: &str, count: usize, payload: &str) -> Result<(), FeedError>;

    /// Delete every entity tagged with `tag`.
    async fn delete_tagged(&self, tag: &str) -> Result<(), FeedError>;
}

/// Whole-database operations used between measurement points.
#[async_trait]
pub trait FeedControl: Send + Sync {
    /// Delete everything, returning the backend to an empty baseline.
    async fn reset_all(&self) -> Result<(), FeedError>;

    /// The cursor of the most recent change in the feed.
    async fn current_cursor(&self) -> Result<Cursor, FeedError>;
}
