//! Polymorphic datastore layer.
//!
//! A [`Datastore`] wraps one connected backend [`Client`] and exposes the
//! whole capability contract. Backends are selected from configuration via
//! the [`Registry`]:
//!
//! ```no_run
//! # async fn run() -> retrieval_datastore::error::Result<()> {
//! use retrieval_datastore::config::AppConfig;
//! use retrieval_datastore::datastore::Datastore;
//!
//! let config = AppConfig::load()?;
//! let store = Datastore::create(config.datastore).await?;
//! let sfo = store.get_airport_by_iata("SFO").await?;
//! store.close().await;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod bridge;
mod capability;
pub mod lifecycle;
mod registry;
mod traits;

pub use capability::{Capabilities, Capability};
pub use registry::{Constructor, Kind, Registry};
pub use traits::{
    AirportStore, AmenityStore, Client, FlightStore, PolicyStore, QueryOutput, TicketStore,
    SEARCH_LIMIT,
};

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::config::DatastoreConfig;
use crate::error::{DatastoreError, Result};
use crate::models::{Airport, Amenity, Dataset, Embedding, Flight, Ticket};

/// Handle to a connected backend.
///
/// Operations of families the backend does not support fail with
/// [`DatastoreError::Unsupported`]. After [`close`](Datastore::close) every
/// operation fails with [`DatastoreError::Closed`].
pub struct Datastore {
    client: Box<dyn Client>,
    closed: AtomicBool,
}

impl Datastore {
    /// Connects the backend named by `config` using the default registry.
    pub async fn create(config: DatastoreConfig) -> Result<Self> {
        Registry::default().create(config).await
    }

    /// Wraps an already connected client.
    pub fn from_client(client: Box<dyn Client>) -> Self {
        Self {
            client,
            closed: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> Kind {
        self.client.kind()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.client.capabilities()
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(DatastoreError::Closed);
        }
        Ok(())
    }

    fn unsupported(&self, capability: Capability) -> DatastoreError {
        DatastoreError::Unsupported {
            kind: self.kind(),
            capability,
        }
    }

    fn airports(&self) -> Result<&dyn AirportStore> {
        self.ensure_open()?;
        self.client
            .airports()
            .ok_or_else(|| self.unsupported(Capability::Airports))
    }

    fn amenities(&self) -> Result<&dyn AmenityStore> {
        self.ensure_open()?;
        self.client
            .amenities()
            .ok_or_else(|| self.unsupported(Capability::Amenities))
    }

    fn flights(&self) -> Result<&dyn FlightStore> {
        self.ensure_open()?;
        self.client
            .flights()
            .ok_or_else(|| self.unsupported(Capability::Flights))
    }

    fn tickets(&self) -> Result<&dyn TicketStore> {
        self.ensure_open()?;
        self.client
            .tickets()
            .ok_or_else(|| self.unsupported(Capability::Tickets))
    }

    fn policies(&self) -> Result<&dyn PolicyStore> {
        self.ensure_open()?;
        self.client
            .policies()
            .ok_or_else(|| self.unsupported(Capability::Policies))
    }

    // ========================================================================
    // Airports
    // ========================================================================

    pub async fn get_airport_by_id(&self, id: i64) -> Result<QueryOutput<Option<Airport>>> {
        self.airports()?.get_airport_by_id(id).await
    }

    pub async fn get_airport_by_iata(&self, iata: &str) -> Result<QueryOutput<Option<Airport>>> {
        self.airports()?.get_airport_by_iata(iata).await
    }

    pub async fn search_airports(
        &self,
        country: Option<&str>,
        city: Option<&str>,
        name: Option<&str>,
    ) -> Result<QueryOutput<Vec<Airport>>> {
        self.airports()?.search_airports(country, city, name).await
    }

    // ========================================================================
    // Amenities
    // ========================================================================

    pub async fn get_amenity(&self, id: i64) -> Result<QueryOutput<Option<Amenity>>> {
        self.amenities()?.get_amenity(id).await
    }

    pub async fn amenities_search(
        &self,
        query: &Embedding,
        similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<Amenity>>> {
        let output = self
            .amenities()?
            .amenities_search(query, similarity_threshold, top_k)
            .await?;
        Ok(output.map(|mut rows| {
            rows.truncate(top_k);
            rows
        }))
    }

    // ========================================================================
    // Flights
    // ========================================================================

    pub async fn get_flight(&self, id: i64) -> Result<QueryOutput<Option<Flight>>> {
        self.flights()?.get_flight(id).await
    }

    pub async fn search_flights_by_number(
        &self,
        airline: &str,
        number: &str,
    ) -> Result<QueryOutput<Vec<Flight>>> {
        self.flights()?
            .search_flights_by_number(airline, number)
            .await
    }

    pub async fn search_flights_by_airports(
        &self,
        date: NaiveDate,
        departure_airport: Option<&str>,
        arrival_airport: Option<&str>,
    ) -> Result<QueryOutput<Vec<Flight>>> {
        self.flights()?
            .search_flights_by_airports(date, departure_airport, arrival_airport)
            .await
    }

    // ========================================================================
    // Tickets
    // ========================================================================

    pub async fn validate_ticket(
        &self,
        airline: &str,
        flight_number: &str,
        departure_airport: &str,
        departure_time: NaiveDateTime,
    ) -> Result<QueryOutput<Option<Flight>>> {
        self.tickets()?
            .validate_ticket(airline, flight_number, departure_airport, departure_time)
            .await
    }

    pub async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.tickets()?.insert_ticket(ticket).await
    }

    pub async fn list_tickets(&self, user_id: &str) -> Result<QueryOutput<Vec<Ticket>>> {
        self.tickets()?.list_tickets(user_id).await
    }

    // ========================================================================
    // Policies
    // ========================================================================

    pub async fn policies_search(
        &self,
        query: &Embedding,
        similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<String>>> {
        let output = self
            .policies()?
            .policies_search(query, similarity_threshold, top_k)
            .await?;
        Ok(output.map(|mut rows| {
            rows.truncate(top_k);
            rows
        }))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Destructively replaces the stored data with `dataset`.
    ///
    /// Fails with `Unsupported` before writing anything if `dataset` holds
    /// records of a family this backend cannot store.
    pub async fn initialize_data(&self, dataset: &Dataset) -> Result<()> {
        self.ensure_open()?;
        lifecycle::ensure_supported(self.kind(), self.capabilities(), dataset)?;

        info!(
            kind = %self.kind(),
            airports = dataset.airports.len(),
            amenities = dataset.amenities.len(),
            flights = dataset.flights.len(),
            policies = dataset.policies.len(),
            "Initializing datastore"
        );
        self.client.initialize_data(dataset).await?;
        info!(kind = %self.kind(), records = dataset.len(), "Datastore initialized");
        Ok(())
    }

    /// Reads every bulk family back, each ordered by ascending id.
    pub async fn export_data(&self) -> Result<Dataset> {
        self.ensure_open()?;
        lifecycle::ensure_exportable(self.kind(), self.capabilities())?;
        self.client.export_data().await
    }

    /// Releases the backend. A second call only logs a warning.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            warn!(kind = %self.kind(), "Datastore already closed");
            return;
        }
        self.client.close().await;
        info!(kind = %self.kind(), "Datastore closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Policy, EMBEDDING_DIMENSIONS};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    /// In-memory backend supporting airports and policies only.
    #[derive(Default)]
    struct MemoryClient {
        airports: Mutex<Vec<Airport>>,
        policies: Mutex<Vec<Policy>>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AirportStore for MemoryClient {
        async fn get_airport_by_id(&self, id: i64) -> Result<QueryOutput<Option<Airport>>> {
            let airports = self.airports.lock().unwrap();
            Ok(QueryOutput::plain(
                airports.iter().find(|a| a.id == id).cloned(),
            ))
        }

        async fn get_airport_by_iata(&self, iata: &str) -> Result<QueryOutput<Option<Airport>>> {
            let airports = self.airports.lock().unwrap();
            Ok(QueryOutput::plain(
                airports
                    .iter()
                    .find(|a| a.iata.eq_ignore_ascii_case(iata))
                    .cloned(),
            ))
        }

        async fn search_airports(
            &self,
            _country: Option<&str>,
            _city: Option<&str>,
            _name: Option<&str>,
        ) -> Result<QueryOutput<Vec<Airport>>> {
            Ok(QueryOutput::plain(self.airports.lock().unwrap().clone()))
        }
    }

    #[async_trait]
    impl PolicyStore for MemoryClient {
        async fn policies_search(
            &self,
            query: &Embedding,
            _similarity_threshold: f64,
            _top_k: usize,
        ) -> Result<QueryOutput<Vec<String>>> {
            // Ignores top_k so the handle's bound is observable.
            let mut policies = self.policies.lock().unwrap().clone();
            policies.sort_by(|a, b| {
                a.embedding
                    .cosine_distance(query)
                    .total_cmp(&b.embedding.cosine_distance(query))
            });
            Ok(QueryOutput::plain(
                policies.into_iter().map(|p| p.content).collect(),
            ))
        }
    }

    #[async_trait]
    impl Client for MemoryClient {
        fn kind(&self) -> Kind {
            Kind::Neo4j
        }

        fn airports(&self) -> Option<&dyn AirportStore> {
            Some(self)
        }

        fn policies(&self) -> Option<&dyn PolicyStore> {
            Some(self)
        }

        async fn initialize_data(&self, dataset: &Dataset) -> Result<()> {
            *self.airports.lock().unwrap() = dataset.airports.clone();
            *self.policies.lock().unwrap() = dataset.policies.clone();
            Ok(())
        }

        async fn export_data(&self) -> Result<Dataset> {
            unreachable!("export is rejected before reaching the client")
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn embedding(hot: usize) -> Embedding {
        let mut values = vec![0.0; EMBEDDING_DIMENSIONS];
        values[hot] = 1.0;
        Embedding::new(values).unwrap()
    }

    fn dataset() -> Dataset {
        Dataset {
            airports: vec![Airport {
                id: 1,
                iata: "SFO".to_string(),
                name: "San Francisco International".to_string(),
                city: "San Francisco".to_string(),
                country: "United States".to_string(),
            }],
            policies: (0..4)
                .map(|i| Policy {
                    id: i as i64,
                    content: format!("policy {}", i),
                    embedding: embedding(i),
                })
                .collect(),
            ..Default::default()
        }
    }

    async fn store() -> (Datastore, Arc<AtomicUsize>) {
        let client = MemoryClient::default();
        let closes = client.closes.clone();
        let store = Datastore::from_client(Box::new(client));
        store.initialize_data(&dataset()).await.unwrap();
        (store, closes)
    }

    #[tokio::test]
    async fn test_capabilities_follow_probes() {
        let (store, _) = store().await;
        assert!(store.supports(Capability::Airports));
        assert!(store.supports(Capability::Policies));
        assert!(!store.supports(Capability::Flights));
        assert!(!store.supports(Capability::Amenities));
    }

    #[tokio::test]
    async fn test_lookup_found_and_not_found() {
        let (store, _) = store().await;

        let found = store.get_airport_by_iata("sfo").await.unwrap();
        assert_eq!(found.data.map(|a| a.id), Some(1));
        assert!(found.sql.is_none());

        let missing = store.get_airport_by_id(999).await.unwrap();
        assert!(missing.data.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_families() {
        let (store, _) = store().await;
        let query = embedding(0);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let time = date.and_hms_opt(10, 0, 0).unwrap();
        let ticket = Ticket {
            user_id: "user".to_string(),
            user_name: "Traveller".to_string(),
            user_email: "traveller@example.com".to_string(),
            airline: "UA".to_string(),
            flight_number: "1111".to_string(),
            departure_airport: "SFO".to_string(),
            arrival_airport: "LAX".to_string(),
            departure_time: time,
            arrival_time: date.and_hms_opt(11, 30, 0).unwrap(),
        };

        let errors = vec![
            store.get_amenity(1).await.err(),
            store.amenities_search(&query, 0.5, 5).await.err(),
            store.get_flight(1).await.err(),
            store.search_flights_by_number("UA", "1111").await.err(),
            store
                .search_flights_by_airports(date, Some("SFO"), None)
                .await
                .err(),
            store.validate_ticket("UA", "1111", "SFO", time).await.err(),
            store.insert_ticket(&ticket).await.err(),
            store.list_tickets("user").await.err(),
            store.export_data().await.err(),
        ];
        for err in errors {
            let err = err.expect("operation must fail");
            assert!(err.is_unsupported(), "unexpected error: {}", err);
        }
    }

    #[tokio::test]
    async fn test_initialize_rejects_unsupported_family() {
        let (store, _) = store().await;
        let departure = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let mut rejected = dataset();
        rejected.airports.clear();
        rejected.flights.push(Flight {
            id: 1,
            airline: "UA".to_string(),
            flight_number: "1111".to_string(),
            departure_airport: "SFO".to_string(),
            arrival_airport: "LAX".to_string(),
            departure_time: departure,
            arrival_time: departure,
            departure_gate: "A1".to_string(),
            arrival_gate: "B1".to_string(),
        });

        let err = store.initialize_data(&rejected).await.unwrap_err();
        assert!(matches!(
            err,
            DatastoreError::Unsupported {
                capability: Capability::Flights,
                ..
            }
        ));
        // Nothing was written.
        assert!(store.get_airport_by_id(1).await.unwrap().data.is_some());
    }

    #[tokio::test]
    async fn test_search_is_bounded_by_top_k() {
        let (store, _) = store().await;
        let output = store.policies_search(&embedding(2), 0.0, 2).await.unwrap();
        assert_eq!(output.data.len(), 2);
        assert_eq!(output.data[0], "policy 2");

        let none = store.policies_search(&embedding(2), 0.0, 0).await.unwrap();
        assert!(none.data.is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let (store, closes) = store().await;

        store.close().await;
        store.close().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(store.is_closed());

        assert!(matches!(
            store.get_airport_by_id(1).await.unwrap_err(),
            DatastoreError::Closed
        ));
        assert!(matches!(
            store.initialize_data(&Dataset::default()).await.unwrap_err(),
            DatastoreError::Closed
        ));
        // Closed wins over unsupported.
        assert!(matches!(
            store.get_flight(1).await.unwrap_err(),
            DatastoreError::Closed
        ));
    }
}
