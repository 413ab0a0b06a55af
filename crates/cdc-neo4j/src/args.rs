//! CLI argument definitions for the Neo4j connection.

use clap::Args;

/// Neo4j connection arguments.
#[derive(Args, Clone, Debug)]
pub struct Neo4jArgs {
    /// Neo4j connection string (e.g., bolt://localhost:7687)
    #[arg(long, env = "NEO4J_URI", default_value = "bolt://localhost:7687")]
    pub neo4j_uri: String,

    /// Neo4j username
    #[arg(long, env = "NEO4J_USERNAME", default_value = "neo4j")]
    pub neo4j_username: String,

    /// Neo4j password
    #[arg(long, env = "NEO4J_PASSWORD")]
    pub neo4j_password: Option<String>,

    /// Neo4j database name
    #[arg(long, env = "NEO4J_DATABASE", default_value = "neo4j")]
    pub neo4j_database: String,
}
