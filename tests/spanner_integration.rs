//! Integration tests for the Cloud Spanner backend.
//!
//! These tests require a Spanner database, or the emulator with
//! `SPANNER_EMULATOR_HOST` set (see `SPANNER_*` variables below).
//! Run with: `cargo test --features integration --test spanner_integration`

#![cfg(feature = "integration")]

mod common;

use retrieval_datastore::config::{DatastoreConfig, SpannerConfig};
use retrieval_datastore::datastore::{Capabilities, Datastore, Kind};
use serial_test::serial;

use common::*;

fn config() -> DatastoreConfig {
    DatastoreConfig::SpannerGsql(SpannerConfig {
        project: env_or("SPANNER_PROJECT", "test-project"),
        instance: env_or("SPANNER_INSTANCE", "test-instance"),
        database: env_or("SPANNER_DATABASE", "assistantdemo"),
        service_account_key_file: std::env::var("SPANNER_KEY_FILE").ok(),
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
mod spanner_tests {
    use super::*;

    #[tokio::test]
    async fn test_supports_every_family() {
        let ds = loaded().await;
        assert_eq!(ds.kind(), Kind::SpannerGsql);
        assert_eq!(ds.capabilities(), Capabilities::all());
        ds.close().await;
    }

    #[tokio::test]
    async fn test_queries_report_sql() {
        let ds = loaded().await;
        let output = ds.get_flight(1).await.unwrap();
        assert!(output.sql.unwrap().contains("FROM flights WHERE id = @id"));
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
