//! Neo4j connection setup.

use crate::args::Neo4jArgs;
use crate::error::Neo4jCdcError;
use neo4rs::{ConfigBuilder, Graph};
use tracing::info;

/// Create a new Neo4j Graph connection
pub async fn new_neo4j_client(args: &Neo4jArgs) -> Result<Graph, Neo4jCdcError> {
    let config = ConfigBuilder::default()
        .uri(&args.neo4j_uri)
        .user(args.neo4j_username.clone())
        .password(
            args.neo4j_password
                .clone()
                .unwrap_or_else(|| "password".to_string()),
        )
        .db(args.neo4j_database.clone())
        .build()?;

    let graph = Graph::connect(config)?;
    info!(uri = %args.neo4j_uri, database = %args.neo4j_database, "Connected to Neo4j");
    Ok(graph)
}
