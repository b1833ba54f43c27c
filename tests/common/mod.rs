//! Shared fixture and assertions for the backend integration tests.
//!
//! Every backend file loads the same dataset (minus the families it does
//! not support) and runs the checks for the families it does.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use retrieval_datastore::datastore::{Capability, Datastore};
use retrieval_datastore::error::DatastoreError;
use retrieval_datastore::models::{
    Airport, Amenity, Dataset, Embedding, Flight, Policy, Ticket, EMBEDDING_DIMENSIONS,
};

/// Reads an env var, falling back to `default`.
pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Unit-ish vector pointing mostly along `primary`, tilted towards `secondary`.
pub fn embedding(primary: usize, secondary: usize, tilt: f32) -> Embedding {
    let mut values = vec![0.0; EMBEDDING_DIMENSIONS];
    values[primary] = 1.0;
    values[secondary] += tilt;
    Embedding::new(values).unwrap()
}

pub fn ts(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M").unwrap()
}

fn airport(id: i64, iata: &str, name: &str, city: &str, country: &str) -> Airport {
    Airport {
        id,
        iata: iata.to_string(),
        name: name.to_string(),
        city: city.to_string(),
        country: country.to_string(),
    }
}

fn amenity(id: i64, name: &str, embedding: Embedding) -> Amenity {
    let mut hours = [None; 14];
    // Open Monday 06:00-22:00 only.
    hours[2] = NaiveTime::from_hms_opt(6, 0, 0);
    hours[3] = NaiveTime::from_hms_opt(22, 0, 0);
    Amenity::from_parts(
        id,
        name.to_string(),
        format!("{} description", name),
        "Near gate B12".to_string(),
        "Terminal 2".to_string(),
        "restaurant".to_string(),
        "Monday 6am-10pm".to_string(),
        hours,
        format!("{} in terminal 2", name),
        embedding,
    )
}

fn flight(id: i64, number: &str, from: &str, to: &str, departs: &str, arrives: &str) -> Flight {
    Flight {
        id,
        airline: "UA".to_string(),
        flight_number: number.to_string(),
        departure_airport: from.to_string(),
        arrival_airport: to.to_string(),
        departure_time: ts(departs),
        arrival_time: ts(arrives),
        departure_gate: "A1".to_string(),
        arrival_gate: "B2".to_string(),
    }
}

/// Full fixture covering every family.
pub fn dataset() -> Dataset {
    let mut united = flight(1, "1111", "SFO", "LAX", "2024-01-01T10:00", "2024-01-01T11:30");
    united.airline = "United".to_string();

    Dataset {
        airports: vec![
            airport(1, "SFO", "San Francisco International Airport", "San Francisco", "United States"),
            airport(2, "LAX", "Los Angeles International Airport", "Los Angeles", "United States"),
            airport(3, "YVR", "Vancouver International Airport", "Vancouver", "Canada"),
        ],
        amenities: vec![
            amenity(1, "Coffee Bar", embedding(0, 1, 0.0)),
            amenity(2, "Noodle House", embedding(0, 1, 0.5)),
            amenity(3, "Book Shop", embedding(1, 0, 0.0)),
        ],
        flights: vec![
            united,
            flight(2, "2222", "SFO", "YVR", "2023-12-31T23:59", "2024-01-01T02:00"),
            flight(3, "3333", "SFO", "LAX", "2024-01-01T08:00", "2024-01-01T09:30"),
            flight(4, "4444", "LAX", "YVR", "2024-01-01T12:00", "2024-01-01T15:00"),
        ],
        policies: vec![
            Policy {
                id: 1,
                content: "Carry-on bags must fit in the overhead bin.".to_string(),
                embedding: embedding(2, 3, 0.0),
            },
            Policy {
                id: 2,
                content: "Checked bags over 50 lbs incur a fee.".to_string(),
                embedding: embedding(2, 3, 0.5),
            },
            Policy {
                id: 3,
                content: "Changes are free up to 24 hours before departure.".to_string(),
                embedding: embedding(4, 5, 0.0),
            },
        ],
    }
}

/// Fixture restricted to the families a graph backend stores.
pub fn graph_dataset() -> Dataset {
    Dataset {
        flights: Vec::new(),
        ..dataset()
    }
}

pub async fn assert_airport_lookups(ds: &Datastore) {
    let sfo = ds.get_airport_by_id(1).await.unwrap().data.unwrap();
    assert_eq!(sfo.iata, "SFO");
    assert!(ds.get_airport_by_id(999).await.unwrap().data.is_none());

    let lax = ds.get_airport_by_iata("lax").await.unwrap().data.unwrap();
    assert_eq!(lax.id, 2);
    assert!(ds.get_airport_by_iata("XXX").await.unwrap().data.is_none());

    let us = ds
        .search_airports(Some("united"), None, None)
        .await
        .unwrap()
        .data;
    let ids: Vec<_> = us.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let named = ds
        .search_airports(None, Some("vancouver"), Some("international"))
        .await
        .unwrap()
        .data;
    assert_eq!(named.len(), 1);
    assert_eq!(named[0].iata, "YVR");

    // Wildcard characters in a filter match literally.
    for filter in ["%", "_", "San_Francisco", "Los%"] {
        let matched = ds.search_airports(None, Some(filter), None).await.unwrap().data;
        assert!(matched.is_empty(), "'{}' matched {:?}", filter, matched);
    }
}

pub async fn assert_amenity_search(ds: &Datastore) {
    let coffee = ds.get_amenity(1).await.unwrap().data.unwrap();
    assert_eq!(coffee, dataset().amenities[0]);
    assert!(ds.get_amenity(999).await.unwrap().data.is_none());

    let query = embedding(0, 1, 0.0);
    let found = ds.amenities_search(&query, 0.7, 2).await.unwrap().data;
    assert!(found.len() <= 2);
    let ids: Vec<_> = found.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let distances: Vec<f32> = found
        .iter()
        .map(|a| a.embedding.cosine_distance(&query))
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));

    assert!(ds.amenities_search(&query, 0.7, 0).await.unwrap().data.is_empty());
}

pub async fn assert_policy_search(ds: &Datastore) {
    let query = embedding(2, 3, 0.0);
    let found = ds.policies_search(&query, 0.5, 1).await.unwrap().data;
    assert_eq!(found, vec![dataset().policies[0].content.clone()]);

    let all = ds.policies_search(&query, 0.5, 10).await.unwrap().data;
    assert_eq!(all.len(), 3);
    assert_eq!(all[2], dataset().policies[2].content);
}

pub async fn assert_flight_queries(ds: &Datastore) {
    let flight = ds.get_flight(1).await.unwrap().data.unwrap();
    assert_eq!(flight.flight_number, "1111");
    assert!(ds.get_flight(999).await.unwrap().data.is_none());

    let by_number = ds.search_flights_by_number("UA", "3333").await.unwrap().data;
    assert_eq!(by_number.len(), 1);
    assert_eq!(by_number[0].id, 3);

    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let from_sfo = ds
        .search_flights_by_airports(date, Some("SFO"), None)
        .await
        .unwrap()
        .data;
    let mut ids: Vec<_> = from_sfo.iter().map(|f| f.id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 3]);

    let to_yvr = ds
        .search_flights_by_airports(date, None, Some("yvr"))
        .await
        .unwrap()
        .data;
    let ids: Vec<_> = to_yvr.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![4]);
}

pub async fn assert_ticket_flow(ds: &Datastore) {
    let matched = ds
        .validate_ticket("united", "1111", "sfo", ts("2024-01-01T10:00"))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(matched.id, 1);
    assert!(ds
        .validate_ticket("united", "1111", "sfo", ts("2024-01-02T10:00"))
        .await
        .unwrap()
        .data
        .is_none());

    let ticket = Ticket {
        user_id: "user-1".to_string(),
        user_name: "Ada Lovelace".to_string(),
        user_email: "ada@example.com".to_string(),
        airline: matched.airline.clone(),
        flight_number: matched.flight_number.clone(),
        departure_airport: matched.departure_airport.clone(),
        arrival_airport: matched.arrival_airport.clone(),
        departure_time: matched.departure_time,
        arrival_time: matched.arrival_time,
    };
    ds.insert_ticket(&ticket).await.unwrap();

    let tickets = ds.list_tickets("user-1").await.unwrap().data;
    assert_eq!(tickets, vec![ticket]);
    assert!(ds.list_tickets("nobody").await.unwrap().data.is_empty());
}

pub async fn assert_export_matches(ds: &Datastore, expected: &Dataset) {
    let exported = ds.export_data().await.unwrap();
    let mut expected = expected.clone();
    expected.sort_by_id();
    assert_eq!(exported, expected);
}

pub fn assert_unsupported<T: std::fmt::Debug>(
    result: Result<T, DatastoreError>,
    capability: Capability,
) {
    match result {
        Err(DatastoreError::Unsupported { capability: c, .. }) => assert_eq!(c, capability),
        other => panic!("expected Unsupported({}), got {:?}", capability, other),
    }
}

pub async fn assert_close_semantics(ds: &Datastore) {
    ds.close().await;
    assert!(ds.is_closed());
    ds.close().await;

    assert!(matches!(
        ds.get_airport_by_id(1).await,
        Err(DatastoreError::Closed)
    ));
    assert!(matches!(
        ds.initialize_data(&Dataset::default()).await,
        Err(DatastoreError::Closed)
    ));
}
