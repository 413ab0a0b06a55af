//! Neo4j backend for cdc-stress.
//!
//! [`Neo4jCdc`] reads the database's change data capture feed through
//! `db.cdc.query` and issues the create/delete batches of the load generator.
//! Bolt values in change events are converted to JSON.

mod args;
mod client;
mod convert;
mod error;
mod feed;

pub use args::Neo4jArgs;
pub use client::new_neo4j_client;
pub use convert::bolt_to_json;
pub use error::Neo4jCdcError;
pub use feed::Neo4jCdc;
