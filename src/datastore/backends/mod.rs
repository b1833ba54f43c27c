//! Backend implementations of the datastore contract.
//!
//! Each backend implements [`Client`](crate::datastore::Client) plus the
//! family traits it supports:
//!
//! | Backend | Module | Driver | Families |
//! |---------|--------|--------|----------|
//! | Cloud SQL for MySQL | [`mysql`] | blocking, bridged | all |
//! | AlloyDB for PostgreSQL | [`postgres`] | async | all |
//! | Cloud Spanner (GoogleSQL) | [`spanner`] | async | all |
//! | Neo4j | [`neo4j`] | async | airports, amenities, policies |
//!
//! # Implementing a Backend
//!
//! 1. Create a client struct (e.g., `MysqlClient`)
//! 2. Implement the family traits it can serve
//! 3. Implement `Client`, overriding the probes of those families
//! 4. Add a constructor `fn create(DatastoreConfig) -> BoxFuture<...>` and
//!    register it in [`Registry::default`](crate::datastore::Registry)

pub mod mysql;
pub mod neo4j;
pub mod postgres;
pub mod spanner;

use crate::config::DatastoreConfig;
use crate::datastore::Kind;
use crate::error::DatastoreError;

/// Error for a constructor handed another backend's configuration.
pub(crate) fn config_mismatch(expected: Kind, config: &DatastoreConfig) -> DatastoreError {
    DatastoreError::InvalidConfig(format!(
        "{} backend cannot be built from a '{}' configuration",
        expected,
        config.kind()
    ))
}

/// Lower-cased `LIKE` pattern matching `text` as a literal substring.
///
/// `%`, `_` and the escape character `\` in `text` are escaped, so user
/// filters never act as wildcards.
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Result bound for a `LIMIT` or `k` parameter; saturates instead of wrapping.
pub(crate) fn limit_param(top_k: usize) -> i64 {
    i64::try_from(top_k).unwrap_or(i64::MAX)
}
