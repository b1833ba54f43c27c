//! Integration tests for the AlloyDB for PostgreSQL backend.
//!
//! These tests require a PostgreSQL instance with the pgvector extension
//! available (see `POSTGRES_*` variables below).
//! Run with: `cargo test --features integration --test postgres_integration`

#![cfg(feature = "integration")]

mod common;

use retrieval_datastore::config::{DatastoreConfig, PostgresConfig};
use retrieval_datastore::datastore::{Capabilities, Datastore, Kind};
use serial_test::serial;

use common::*;

fn config() -> DatastoreConfig {
    DatastoreConfig::AlloyDbPostgres(PostgresConfig {
        project: env_or("POSTGRES_PROJECT", "test-project"),
        region: env_or("POSTGRES_REGION", "us-central1"),
        cluster: env_or("POSTGRES_CLUSTER", "test-cluster"),
        instance: env_or("POSTGRES_INSTANCE", "test-instance"),
        user: env_or("POSTGRES_USER", "postgres"),
        password: env_or("POSTGRES_PASSWORD", "postgres"),
        database: env_or("POSTGRES_DATABASE", "assistantdemo"),
        host: env_or("POSTGRES_HOST", "127.0.0.1"),
        port: env_or("POSTGRES_PORT", "5432").parse().unwrap(),
    })
}

async fn loaded() -> Datastore {
    let ds = Datastore::create(config())
        .await
        .expect("Failed to connect to test database");
    ds.initialize_data(&dataset())
        .await
        .expect("Failed to load fixture");
    ds
}

#[serial]
mod postgres_tests {
    use super::*;

    #[tokio::test]
    async fn test_supports_every_family() {
        let ds = loaded().await;
        assert_eq!(ds.kind(), Kind::AlloyDbPostgres);
        assert_eq!(ds.capabilities(), Capabilities::all());
        ds.close().await;
    }

    #[tokio::test]
    async fn test_queries_report_sql() {
        let ds = loaded().await;
        let output = ds.get_airport_by_id(1).await.unwrap();
        assert!(output.sql.unwrap().contains("FROM airports"));
        ds.close().await;
    }

    #[tokio::test]
    async fn test_airports() {
        let ds = loaded().await;
        assert_airport_lookups(&ds).await;
        ds.close().await;
    }

    #[tokio::test]
    async fn test_amenities() {
        let ds = loaded().await;
        assert_amenity_search(&ds).await;
        ds.close().await;
    }

    #[tokio::test]
    async fn test_flights() {
        let ds = loaded().await;
        assert_flight_queries(&ds).await;
        ds.close().await;
    }

    #[tokio::test]
    async fn test_tickets() {
        let ds = loaded().await;
        assert_ticket_flow(&ds).await;
        ds.close().await;
    }

    #[tokio::test]
    async fn test_policies() {
        let ds = loaded().await;
        assert_policy_search(&ds).await;
        ds.close().await;
    }

    #[tokio::test]
    async fn test_export_round_trip() {
        let ds = loaded().await;
        assert_export_matches(&ds, &dataset()).await;
        ds.close().await;
    }

    #[tokio::test]
    async fn test_close() {
        let ds = loaded().await;
        assert_close_semantics(&ds).await;
    }
}
