//! In-process change feed backend.
//!
//! `MemoryGraph` keeps tagged nodes and an append-only change log. Every
//! create and delete appends one change whose cursor is its 1-based position
//! in the log, so cursor `"0"` means "before the first change". It serves
//! tests and `--backend memory` dry runs, and can be told to fail upcoming
//! feed queries to exercise error paths.

use crate::error::FeedError;
use crate::feed::{ChangeFeed, ChangeWriter, FeedControl};
use crate::record::{ChangeRecord, Cursor};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Default maximum number of changes returned by one query.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Default)]
struct GraphState {
    changes: Vec<ChangeRecord>,
    /// Live node count per tag.
    nodes: HashMap<String, u64>,
    next_tx: i64,
    next_node: u64,
}

impl GraphState {
    fn begin_tx(&mut self) -> i64 {
        self.next_tx += 1;
        self.next_tx
    }

    fn append(&mut self, tx_id: i64, seq: i64, operation: &str, tag: &str, payload: Option<&str>) {
        self.next_node += 1;
        let after = payload.map(|p| json!({ "properties": { "payload": p } }));
        let event = json!({
            "elementId": format!("{tag}:{}", self.next_node),
            "eventType": "n",
            "operation": operation,
            "labels": [tag],
            "state": { "before": null, "after": after },
        });
        let metadata = json!({
            "executingUser": "memory",
            "txStartTime": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        let id = (self.changes.len() + 1).to_string();
        self.changes
            .push(ChangeRecord::new(id, tx_id, seq, event, metadata));
    }
}

/// In-memory backend implementing [`ChangeFeed`], [`ChangeWriter`] and
/// [`FeedControl`].
#[derive(Debug)]
pub struct MemoryGraph {
    state: Mutex<GraphState>,
    faults: Mutex<VecDeque<FeedError>>,
    page_size: usize,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GraphState::default()),
            faults: Mutex::new(VecDeque::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Limit how many changes a single query returns.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make the next feed query fail with `error`. Calls queue up in order.
    pub fn fail_next_query(&self, error: FeedError) {
        lock(&self.faults).push_back(error);
    }

    /// Number of changes in the log.
    pub fn change_count(&self) -> usize {
        lock(&self.state).changes.len()
    }

    /// Number of live nodes carrying `tag`.
    pub fn node_count(&self, tag: &str) -> u64 {
        lock(&self.state).nodes.get(tag).copied().unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn parse_cursor(cursor: &Cursor) -> Result<usize, FeedError> {
    cursor
        .as_str()
        .parse::<usize>()
        .map_err(|_| FeedError::InvalidCursor(cursor.to_string()))
}

#[async_trait]
impl ChangeFeed for MemoryGraph {
    async fn query(&self, cursor: &Cursor) -> Result<Vec<ChangeRecord>, FeedError> {
        if let Some(fault) = lock(&self.faults).pop_front() {
            debug!("Injected feed failure: {fault}");
            return Err(fault);
        }

        let position = parse_cursor(cursor)?;
        let state = lock(&self.state);
        if position >= state.changes.len() {
            return Ok(Vec::new());
        }
        let end = (position + self.page_size).min(state.changes.len());
        Ok(state.changes[position..end].to_vec())
    }
}

#[async_trait]
impl ChangeWriter for MemoryGraph {
    async fn create_tagged(&self, tag: &str, count: usize, payload: &str) -> Result<(), FeedError> {
        let mut state = lock(&self.state);
        let tx_id = state.begin_tx();
        for seq in 0..count {
            state.append(tx_id, seq as i64, "c", tag, Some(payload));
        }
        *state.nodes.entry(tag.to_string()).or_default() += count as u64;
        Ok(())
    }

    async fn delete_tagged(&self, tag: &str) -> Result<(), FeedError> {
        let mut state = lock(&self.state);
        let live = state.nodes.remove(tag).unwrap_or(0);
        let tx_id = state.begin_tx();
        for seq in 0..live {
            state.append(tx_id, seq as i64, "d", tag, None);
        }
        Ok(())
    }
}

#[async_trait]
impl FeedControl for MemoryGraph {
    async fn reset_all(&self) -> Result<(), FeedError> {
        let mut state = lock(&self.state);
        let nodes: Vec<(String, u64)> = state.nodes.drain().collect();
        let tx_id = state.begin_tx();
        let mut seq = 0;
        for (tag, live) in nodes {
            for _ in 0..live {
                state.append(tx_id, seq, "d", &tag, None);
                seq += 1;
            }
        }
        debug!(deleted = seq, "Reset in-memory graph");
        Ok(())
    }

    async fn current_cursor(&self) -> Result<Cursor, FeedError> {
        Ok(Cursor::new(lock(&self.state).changes.len().to_string()))
    }
}
