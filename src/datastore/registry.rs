//! Backend discriminators and the kind → constructor registry.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::backends;
use super::traits::Client;
use super::Datastore;
use crate::config::DatastoreConfig;
use crate::error::{DatastoreError, Result};

/// Discriminator naming a datastore backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    #[serde(rename = "cloudsql-mysql")]
    CloudSqlMysql,
    #[serde(rename = "alloydb-postgres")]
    AlloyDbPostgres,
    #[serde(rename = "spanner-gsql")]
    SpannerGsql,
    #[serde(rename = "neo4j")]
    Neo4j,
}

impl Kind {
    /// Returns a static slice of all known kinds.
    pub fn all() -> &'static [Kind] {
        &[
            Kind::CloudSqlMysql,
            Kind::AlloyDbPostgres,
            Kind::SpannerGsql,
            Kind::Neo4j,
        ]
    }

    /// The configuration discriminator string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::CloudSqlMysql => "cloudsql-mysql",
            Kind::AlloyDbPostgres => "alloydb-postgres",
            Kind::SpannerGsql => "spanner-gsql",
            Kind::Neo4j => "neo4j",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = DatastoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DatastoreError::UnknownKind(s.to_string()))
    }
}

/// Builds a connected client from its configuration.
pub type Constructor = fn(DatastoreConfig) -> BoxFuture<'static, Result<Box<dyn Client>>>;

/// Maps each [`Kind`] to the constructor of its backend.
///
/// `Registry::default()` knows every built-in backend; `Registry::new()`
/// starts empty so tests and embedders can register their own.
pub struct Registry {
    constructors: HashMap<Kind, Constructor>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers `constructor` for `kind`, replacing any previous one.
    pub fn register(mut self, kind: Kind, constructor: Constructor) -> Self {
        self.constructors.insert(kind, constructor);
        self
    }

    pub fn contains(&self, kind: Kind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Registered kinds in declaration order.
    pub fn kinds(&self) -> Vec<Kind> {
        Kind::all()
            .iter()
            .copied()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    /// Validates `config` and connects the backend it names.
    ///
    /// Validation happens before any network activity.
    pub async fn create(&self, config: DatastoreConfig) -> Result<Datastore> {
        config.validate()?;

        let kind = config.kind();
        let constructor = self
            .constructors
            .get(&kind)
            .ok_or_else(|| DatastoreError::UnknownKind(kind.to_string()))?;

        info!(%kind, "Connecting to datastore");
        let client = constructor(config).await?;
        debug!(%kind, capabilities = ?client.capabilities(), "Datastore connected");

        Ok(Datastore::from_client(client))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
            .register(Kind::CloudSqlMysql, backends::mysql::create)
            .register(Kind::AlloyDbPostgres, backends::postgres::create)
            .register(Kind::SpannerGsql, backends::spanner::create)
            .register(Kind::Neo4j, backends::neo4j::create)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Neo4jAuth, Neo4jConfig};

    fn neo4j_config(uri: &str) -> DatastoreConfig {
        DatastoreConfig::Neo4j(Neo4jConfig {
            uri: uri.to_string(),
            auth: Neo4jAuth {
                username: "neo4j".to_string(),
                password: "secret".to_string(),
            },
        })
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in Kind::all() {
            assert_eq!(kind.as_str().parse::<Kind>().unwrap(), *kind);
        }
        assert_eq!("Neo4J".parse::<Kind>().unwrap(), Kind::Neo4j);
        assert_eq!(" spanner-gsql ".parse::<Kind>().unwrap(), Kind::SpannerGsql);
    }

    #[test]
    fn test_unknown_kind() {
        let err = "firestore".parse::<Kind>().unwrap_err();
        assert!(matches!(err, DatastoreError::UnknownKind(ref s) if s == "firestore"));
    }

    #[test]
    fn test_default_registers_every_kind() {
        assert_eq!(Registry::default().kinds(), Kind::all().to_vec());
        assert!(Registry::new().kinds().is_empty());
    }

    #[tokio::test]
    async fn test_create_unregistered_kind() {
        let err = Registry::new()
            .create(neo4j_config("neo4j://localhost:7687"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DatastoreError::UnknownKind(ref s) if s == "neo4j"));
    }

    #[tokio::test]
    async fn test_create_validates_before_connecting() {
        fn never_called(_: DatastoreConfig) -> BoxFuture<'static, Result<Box<dyn Client>>> {
            panic!("constructor must not run for an invalid config")
        }

        let registry = Registry::new().register(Kind::Neo4j, never_called);
        let err = registry
            .create(neo4j_config("localhost:7687"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DatastoreError::InvalidConfig(_)));
    }
}
