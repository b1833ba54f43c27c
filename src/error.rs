//! Datastore error taxonomy.

use thiserror::Error;

use crate::config::ConfigError;
use crate::datastore::{Capability, Kind};

/// Errors surfaced by the datastore layer.
///
/// Not-found is never an error: point lookups return `None`. Failures while
/// shutting down are logged by the backends instead of being returned.
#[derive(Error, Debug)]
pub enum DatastoreError {
    // Capability errors
    #[error("{kind} datastore does not support {capability}")]
    Unsupported { kind: Kind, capability: Capability },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown datastore kind: {0}")]
    UnknownKind(String),

    // Driver errors
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql::Error),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),

    #[error("Spanner error: {0}")]
    Spanner(String),

    #[error("Query failed: {message}")]
    Query { message: String, query: String },

    #[error("Failed to decode row: {0}")]
    Decode(String),

    // Value errors
    #[error("Embedding must have {expected} dimensions, got {actual}")]
    InvalidEmbedding { expected: usize, actual: usize },

    #[error("Embedding component {index} is not a finite number")]
    NonFiniteEmbedding { index: usize },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    // Runtime errors
    #[error("Blocking worker failed: {0}")]
    Worker(String),

    #[error("Datastore client is closed")]
    Closed,
}

impl DatastoreError {
    /// Returns true if this error reports a capability gap of the backend.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, DatastoreError::Unsupported { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = DatastoreError> = std::result::Result<T, E>;
