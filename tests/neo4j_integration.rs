//! Integration tests for the Neo4j backend.
//!
//! These tests require a Neo4j 5.x instance with vector index support
//! (see `NEO4J_*` variables below).
//! Run with: `cargo test --features integration --test neo4j_integration`

#![cfg(feature = "integration")]

mod common;

use chrono::NaiveDate;
use retrieval_datastore::config::{DatastoreConfig, Neo4jAuth, Neo4jConfig};
use retrieval_datastore::datastore::{Capability, Datastore, Kind};
use retrieval_datastore::models::Ticket;
use serial_test::serial;

use common::*;

fn config() -> DatastoreConfig {
    DatastoreConfig::Neo4j(Neo4jConfig {
        uri: env_or("NEO4J_URI", "neo4j://localhost:7687"),
        auth: Neo4jAuth {
            username: env_or("NEO4J_USER", "neo4j"),
            password: env_or("NEO4J_PASSWORD", "password"),
        },
    })
}

async fn loaded() -> Datastore {
    let ds = Datastore::create(config())
        .await
        .expect("Failed to connect to test database");
    ds.initialize_data(&graph_dataset())
        .await
        .expect("Failed to load fixture");
    ds
}

#[serial]
mod neo4j_tests {
    use super::*;

    #[tokio::test]
    async fn test_capabilities() {
        let ds = loaded().await;
        assert_eq!(ds.kind(), Kind::Neo4j);
        assert!(ds.supports(Capability::Airports));
        assert!(ds.supports(Capability::Amenities));
        assert!(ds.supports(Capability::Policies));
        assert!(!ds.supports(Capability::Flights));
        assert!(!ds.supports(Capability::Tickets));
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
    async fn test_policies() {
        let ds = loaded().await;
        assert_policy_search(&ds).await;
        ds.close().await;
    }

    #[tokio::test]
    async fn test_unsupported_families() {
        let ds = loaded().await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert_unsupported(ds.get_flight(1).await, Capability::Flights);
        assert_unsupported(
            ds.search_flights_by_number("UA", "1111").await,
            Capability::Flights,
        );
        assert_unsupported(
            ds.search_flights_by_airports(date, Some("SFO"), None).await,
            Capability::Flights,
        );
        assert_unsupported(
            ds.validate_ticket("united", "1111", "sfo", ts("2024-01-01T10:00"))
                .await,
            Capability::Tickets,
        );
        let ticket = Ticket {
            user_id: "user-1".to_string(),
            user_name: "Ada".to_string(),
            user_email: "ada@example.com".to_string(),
            airline: "United".to_string(),
            flight_number: "1111".to_string(),
            departure_airport: "SFO".to_string(),
            arrival_airport: "LAX".to_string(),
            departure_time: ts("2024-01-01T10:00"),
            arrival_time: ts("2024-01-01T11:30"),
        };
        assert_unsupported(ds.insert_ticket(&ticket).await, Capability::Tickets);
        assert_unsupported(ds.list_tickets("user-1").await, Capability::Tickets);
        assert_unsupported(ds.export_data().await, Capability::Flights);
        ds.close().await;
    }

    #[tokio::test]
    async fn test_initialize_rejects_flights() {
        let ds = Datastore::create(config()).await.unwrap();
        assert_unsupported(ds.initialize_data(&dataset()).await, Capability::Flights);
        ds.close().await;
    }

    #[tokio::test]
    async fn test_close() {
        let ds = loaded().await;
        assert_close_semantics(&ds).await;
    }
}
