//! Change feed, writer and control operations against Neo4j.

use crate::convert::bolt_to_json;
use crate::error::Neo4jCdcError;
use async_trait::async_trait;
use cdc_core::{ChangeFeed, ChangeRecord, ChangeWriter, Cursor, FeedControl, FeedError};
use neo4rs::{query, BoltType, Graph, Query, Row};
use tracing::debug;

const CDC_QUERY: &str = "CALL db.cdc.query($previous_id) \
     YIELD id, txId, seq, event, metadata \
     RETURN id, txId, seq, event, metadata";

const CDC_CURRENT: &str = "CALL db.cdc.current() YIELD id RETURN id";

/// Neo4j backend for the capture engines and the load generator.
///
/// `Graph` pools its connections, so one `Neo4jCdc` can be shared by every
/// producer and load worker.
#[derive(Clone)]
pub struct Neo4jCdc {
    graph: Graph,
}

impl Neo4jCdc {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    async fn changes_since(&self, cursor: &Cursor) -> Result<Vec<ChangeRecord>, Neo4jCdcError> {
        let q = query(CDC_QUERY).param("previous_id", cursor.as_str());
        let mut result = self.graph.execute(q).await?;

        let mut records = Vec::new();
        while let Some(row) = result.next().await? {
            records.push(record_from_row(&row)?);
        }
        debug!(from = %cursor, count = records.len(), "Fetched CDC changes");
        Ok(records)
    }

    async fn run_statement(&self, q: Query) -> Result<(), Neo4jCdcError> {
        self.graph.run(q).await?;
        Ok(())
    }
}

fn column<T: serde::de::DeserializeOwned>(row: &Row, name: &'static str) -> Result<T, Neo4jCdcError> {
    row.get(name).map_err(|e| Neo4jCdcError::Decode {
        column: name,
        reason: e.to_string(),
    })
}

fn record_from_row(row: &Row) -> Result<ChangeRecord, Neo4jCdcError> {
    let id: String = column(row, "id")?;
    let tx_id: i64 = column(row, "txId")?;
    let seq: i64 = column(row, "seq")?;
    let event: BoltType = column(row, "event")?;
    let metadata: BoltType = column(row, "metadata")?;
    Ok(ChangeRecord::new(
        Cursor::new(id),
        tx_id,
        seq,
        bolt_to_json(event),
        bolt_to_json(metadata),
    ))
}

/// Labels are spliced into Cypher text, so only plain identifiers pass.
fn checked_label(tag: &str) -> Result<&str, Neo4jCdcError> {
    let valid = !tag.is_empty()
        && !tag.starts_with(|c: char| c.is_ascii_digit())
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(tag)
    } else {
        Err(Neo4jCdcError::InvalidLabel(tag.to_string()))
    }
}

#[async_trait]
impl ChangeFeed for Neo4jCdc {
    async fn query(&self, cursor: &Cursor) -> Result<Vec<ChangeRecord>, FeedError> {
        Ok(self.changes_since(cursor).await?)
    }
}

#[async_trait]
impl ChangeWriter for Neo4jCdc {
    async fn create_tagged(&self, tag: &str, count: usize, payload: &str) -> Result<(), FeedError> {
        let label = checked_label(tag)?;
        let cypher = format!(
            "UNWIND range(1, $node_count) AS i CREATE (n:{label}) SET n.payload = $payload"
        );
        let q = query(&cypher)
            .param("node_count", count as i64)
            .param("payload", payload);
        Ok(self.run_statement(q).await?)
    }

    async fn delete_tagged(&self, tag: &str) -> Result<(), FeedError> {
        let label = checked_label(tag)?;
        Ok(self
            .run_statement(query(&format!("MATCH (n:{label}) DETACH DELETE n")))
            .await?)
    }
}

#[async_trait]
impl FeedControl for Neo4jCdc {
    async fn reset_all(&self) -> Result<(), FeedError> {
        Ok(self.run_statement(query("MATCH (n) DETACH DELETE n")).await?)
    }

    async fn current_cursor(&self) -> Result<Cursor, FeedError> {
        let mut result = self
            .graph
            .execute(query(CDC_CURRENT))
            .await
            .map_err(Neo4jCdcError::from)?;
        match result.next().await.map_err(Neo4jCdcError::from)? {
            Some(row) => Ok(Cursor::new(column::<String>(&row, "id")?)),
            None => Err(FeedError::InvalidCursor(
                "db.cdc.current() returned no rows".to_string(),
            )),
        }
    }
}
