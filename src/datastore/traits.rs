//! The capability contract every backend implements.
//!
//! The contract is split into optional family traits plus the mandatory
//! [`Client`] lifecycle trait:
//!
//! - [`AirportStore`] - airport lookups and search
//! - [`AmenityStore`] - amenity lookup and similarity search
//! - [`FlightStore`] - flight lookups and search
//! - [`TicketStore`] - ticket validation, booking and listing
//! - [`PolicyStore`] - policy similarity search
//! - [`Client`] - capability probes, bulk load, export and shutdown
//!
//! A backend implements the family traits it supports and returns itself
//! from the matching probe (`fn airports(&self) -> Option<&dyn AirportStore>`).
//! Callers normally go through [`Datastore`](super::Datastore), which turns a
//! `None` probe into [`DatastoreError::Unsupported`](crate::error::DatastoreError::Unsupported).

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::datastore::{Capabilities, Capability, Kind};
use crate::error::Result;
use crate::models::{Airport, Amenity, Dataset, Embedding, Flight, Ticket};

/// Result of a query plus the statement that produced it.
///
/// `sql` is a diagnostic: relational backends may surface the query they
/// executed, others leave it `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput<T> {
    pub data: T,
    pub sql: Option<String>,
}

impl<T> QueryOutput<T> {
    pub fn new(data: T, sql: Option<String>) -> Self {
        Self { data, sql }
    }

    /// Output without a diagnostic statement.
    pub fn plain(data: T) -> Self {
        Self { data, sql: None }
    }

    /// Output annotated with the executed statement.
    pub fn with_sql(data: T, sql: &str) -> Self {
        Self {
            data,
            sql: Some(sql.to_string()),
        }
    }

    /// Transforms the data, keeping the diagnostic.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryOutput<U> {
        QueryOutput {
            data: f(self.data),
            sql: self.sql,
        }
    }
}

/// Maximum rows returned by the airport and flight searches.
pub const SEARCH_LIMIT: i64 = 10;

/// Airport lookups.
#[async_trait]
pub trait AirportStore: Send + Sync {
    async fn get_airport_by_id(&self, id: i64) -> Result<QueryOutput<Option<Airport>>>;

    /// Case-insensitive match on the IATA code.
    async fn get_airport_by_iata(&self, iata: &str) -> Result<QueryOutput<Option<Airport>>>;

    /// Case-insensitive substring match on every supplied filter.
    ///
    /// Unset filters match everything. Ordered by id, at most
    /// [`SEARCH_LIMIT`] rows.
    async fn search_airports(
        &self,
        country: Option<&str>,
        city: Option<&str>,
        name: Option<&str>,
    ) -> Result<QueryOutput<Vec<Airport>>>;
}

/// Amenity lookup and nearest-neighbor search.
#[async_trait]
pub trait AmenityStore: Send + Sync {
    async fn get_amenity(&self, id: i64) -> Result<QueryOutput<Option<Amenity>>>;

    /// Returns at most `top_k` amenities by ascending distance to `query`.
    ///
    /// `similarity_threshold` is accepted for interface compatibility and
    /// does not filter results.
    async fn amenities_search(
        &self,
        query: &Embedding,
        similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<Amenity>>>;
}

/// Flight lookups.
#[async_trait]
pub trait FlightStore: Send + Sync {
    async fn get_flight(&self, id: i64) -> Result<QueryOutput<Option<Flight>>>;

    /// Exact match on airline and flight number, at most [`SEARCH_LIMIT`] rows.
    async fn search_flights_by_number(
        &self,
        airline: &str,
        number: &str,
    ) -> Result<QueryOutput<Vec<Flight>>>;

    /// Flights departing within the 24 hours starting at `date`.
    ///
    /// Airport filters are case-insensitive substring matches; at most
    /// [`SEARCH_LIMIT`] rows ordered by id.
    async fn search_flights_by_airports(
        &self,
        date: NaiveDate,
        departure_airport: Option<&str>,
        arrival_airport: Option<&str>,
    ) -> Result<QueryOutput<Vec<Flight>>>;
}

/// Ticket validation, booking and listing.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Finds the flight a ticket would be issued for.
    ///
    /// Airline, flight number and departure airport match case-insensitively;
    /// the departure time must match exactly.
    async fn validate_ticket(
        &self,
        airline: &str,
        flight_number: &str,
        departure_airport: &str,
        departure_time: NaiveDateTime,
    ) -> Result<QueryOutput<Option<Flight>>>;

    /// Appends a ticket. No uniqueness check is performed.
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()>;

    /// All tickets booked by `user_id`, in backend order.
    async fn list_tickets(&self, user_id: &str) -> Result<QueryOutput<Vec<Ticket>>>;
}

/// Policy nearest-neighbor search.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Returns the content of at most `top_k` policies by ascending distance.
    ///
    /// `similarity_threshold` is accepted and ignored, as for amenities.
    async fn policies_search(
        &self,
        query: &Embedding,
        similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<String>>>;
}

/// A connected datastore backend.
///
/// Family probes default to `None`; a backend overrides the probes of the
/// families it implements.
#[async_trait]
pub trait Client: Send + Sync {
    /// Discriminator of this backend.
    fn kind(&self) -> Kind;

    fn airports(&self) -> Option<&dyn AirportStore> {
        None
    }

    fn amenities(&self) -> Option<&dyn AmenityStore> {
        None
    }

    fn flights(&self) -> Option<&dyn FlightStore> {
        None
    }

    fn tickets(&self) -> Option<&dyn TicketStore> {
        None
    }

    fn policies(&self) -> Option<&dyn PolicyStore> {
        None
    }

    /// The families this backend supports, derived from the probes.
    fn capabilities(&self) -> Capabilities {
        let probes = [
            (Capability::Airports, self.airports().is_some()),
            (Capability::Amenities, self.amenities().is_some()),
            (Capability::Flights, self.flights().is_some()),
            (Capability::Tickets, self.tickets().is_some()),
            (Capability::Policies, self.policies().is_some()),
        ];
        probes
            .into_iter()
            .filter(|(_, supported)| *supported)
            .map(|(capability, _)| capability)
            .collect()
    }

    /// Destructively replaces every bulk family with `dataset`.
    ///
    /// Callers must not pass records of families the backend does not
    /// support; [`Datastore`](super::Datastore) checks this up front.
    async fn initialize_data(&self, dataset: &Dataset) -> Result<()>;

    /// Reads every bulk family back, ordered by ascending id.
    async fn export_data(&self) -> Result<Dataset>;

    /// Releases the backend's resources.
    ///
    /// Failures are logged, not returned, so shutdown of other resources
    /// can proceed.
    async fn close(&self);
}
