//! Cloud Spanner (GoogleSQL dialect) backend.
//!
//! Schema changes go through the database admin API as one DDL batch;
//! rows are written with insert mutations committed in batches of
//! [`BATCH_SIZE`]. Similarity search is an exact scan ordered by
//! `COSINE_DISTANCE`, so no vector index is maintained.
//!
//! Opening hours and flight/ticket times are stored as canonical strings
//! (`HH:MM:SS` and [`TIMESTAMP_FORMAT`](crate::models::time::TIMESTAMP_FORMAT)).
//! The canonical timestamp text sorts in time order, so day windows are
//! plain string range comparisons.
//!
//! The `SPANNER_EMULATOR_HOST` environment variable is honoured by the
//! underlying client, which makes the emulator usable for tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use futures::future::BoxFuture;
use google_cloud_googleapis::spanner::admin::database::v1::UpdateDatabaseDdlRequest;
use google_cloud_googleapis::spanner::v1::Mutation;
use google_cloud_spanner::admin::client::Client as AdminClient;
use google_cloud_spanner::admin::AdminClientConfig;
use google_cloud_spanner::client::google_cloud_auth::credentials::CredentialsFile;
use google_cloud_spanner::client::{Client as SessionClient, ClientConfig};
use google_cloud_spanner::mutation::insert;
use google_cloud_spanner::row::{Row, TryFromValue};
use google_cloud_spanner::statement::{Statement, ToKind};
use tracing::{debug, info, warn};

use super::{config_mismatch, contains_pattern, limit_param};
use crate::config::{DatastoreConfig, SpannerConfig};
use crate::datastore::lifecycle;
use crate::datastore::{
    AirportStore, AmenityStore, Client, FlightStore, Kind, PolicyStore, QueryOutput, TicketStore,
    SEARCH_LIMIT,
};
use crate::error::{DatastoreError, Result};
use crate::models::time::{
    day_window, format_time_of_day, format_timestamp, parse_time_of_day, parse_timestamp,
};
use crate::models::{
    Airport, Amenity, Dataset, Embedding, Flight, Policy, Ticket, WEEKLY_HOUR_COLUMNS,
};

/// Rows per committed mutation batch.
const BATCH_SIZE: usize = 1000;

// ----------------------------------------------------------------------------
// Schema
// ----------------------------------------------------------------------------

const CREATE_AIRPORTS: &str = "CREATE TABLE airports (
      id INT64,
      iata STRING(MAX),
      name STRING(MAX),
      city STRING(MAX),
      country STRING(MAX)
    ) PRIMARY KEY (id)";

const CREATE_AMENITIES: &str = "CREATE TABLE amenities (
      id INT64,
      name STRING(MAX),
      description STRING(MAX),
      location STRING(MAX),
      terminal STRING(MAX),
      category STRING(MAX),
      hour STRING(MAX),
      sunday_start_hour STRING(100),
      sunday_end_hour STRING(100),
      monday_start_hour STRING(100),
      monday_end_hour STRING(100),
      tuesday_start_hour STRING(100),
      tuesday_end_hour STRING(100),
      wednesday_start_hour STRING(100),
      wednesday_end_hour STRING(100),
      thursday_start_hour STRING(100),
      thursday_end_hour STRING(100),
      friday_start_hour STRING(100),
      friday_end_hour STRING(100),
      saturday_start_hour STRING(100),
      saturday_end_hour STRING(100),
      content STRING(MAX) NOT NULL,
      embedding ARRAY<FLOAT64> NOT NULL
    ) PRIMARY KEY (id)";

const CREATE_FLIGHTS: &str = "CREATE TABLE flights (
      id INT64,
      airline STRING(MAX),
      flight_number STRING(MAX),
      departure_airport STRING(MAX),
      arrival_airport STRING(MAX),
      departure_time STRING(100),
      arrival_time STRING(100),
      departure_gate STRING(MAX),
      arrival_gate STRING(MAX)
    ) PRIMARY KEY (id)";

const CREATE_TICKETS: &str = "CREATE TABLE tickets (
      user_id STRING(MAX),
      user_name STRING(MAX),
      user_email STRING(MAX),
      airline STRING(MAX),
      flight_number STRING(MAX),
      departure_airport STRING(MAX),
      arrival_airport STRING(MAX),
      departure_time STRING(100),
      arrival_time STRING(100)
    ) PRIMARY KEY (user_id, airline, flight_number, departure_time)";

const CREATE_POLICIES: &str = "CREATE TABLE policies (
      id INT64,
      content STRING(MAX) NOT NULL,
      embedding ARRAY<FLOAT64> NOT NULL
    ) PRIMARY KEY (id)";

/// Tables in the order a bulk load recreates them.
const TABLES: [(&str, &str); 5] = [
    ("airports", CREATE_AIRPORTS),
    ("amenities", CREATE_AMENITIES),
    ("flights", CREATE_FLIGHTS),
    ("tickets", CREATE_TICKETS),
    ("policies", CREATE_POLICIES),
];

/// DDL batch that drops and recreates every table.
fn schema_statements() -> Vec<String> {
    TABLES
        .iter()
        .flat_map(|(table, create)| {
            [format!("DROP TABLE IF EXISTS {}", table), create.to_string()]
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Statements
// ----------------------------------------------------------------------------

const AIRPORT_COLUMNS: [&str; 5] = ["id", "iata", "name", "city", "country"];

const AMENITY_COLUMNS: [&str; 23] = [
    "id",
    "name",
    "description",
    "location",
    "terminal",
    "category",
    "hour",
    "sunday_start_hour",
    "sunday_end_hour",
    "monday_start_hour",
    "monday_end_hour",
    "tuesday_start_hour",
    "tuesday_end_hour",
    "wednesday_start_hour",
    "wednesday_end_hour",
    "thursday_start_hour",
    "thursday_end_hour",
    "friday_start_hour",
    "friday_end_hour",
    "saturday_start_hour",
    "saturday_end_hour",
    "content",
    "embedding",
];

const FLIGHT_COLUMNS: [&str; 9] = [
    "id",
    "airline",
    "flight_number",
    "departure_airport",
    "arrival_airport",
    "departure_time",
    "arrival_time",
    "departure_gate",
    "arrival_gate",
];

const TICKET_COLUMNS: [&str; 9] = [
    "user_id",
    "user_name",
    "user_email",
    "airline",
    "flight_number",
    "departure_airport",
    "arrival_airport",
    "departure_time",
    "arrival_time",
];

const POLICY_COLUMNS: [&str; 3] = ["id", "content", "embedding"];

fn select(columns: &[&str], rest: &str) -> String {
    format!("SELECT {} {}", columns.join(", "), rest)
}

fn get_airport_by_id_sql() -> String {
    select(&AIRPORT_COLUMNS, "FROM airports WHERE id = @id")
}

fn get_airport_by_iata_sql() -> String {
    select(
        &AIRPORT_COLUMNS,
        "FROM airports WHERE LOWER(iata) = LOWER(@iata) ORDER BY id LIMIT 1",
    )
}

fn search_airports_sql() -> String {
    select(
        &AIRPORT_COLUMNS,
        "FROM airports \
         WHERE (@country IS NULL OR LOWER(country) LIKE @country) \
           AND (@city IS NULL OR LOWER(city) LIKE @city) \
           AND (@name IS NULL OR LOWER(name) LIKE @name) \
         ORDER BY id LIMIT @limit",
    )
}

fn get_amenity_sql() -> String {
    select(&AMENITY_COLUMNS, "FROM amenities WHERE id = @id")
}

fn amenities_search_sql() -> String {
    select(
        &AMENITY_COLUMNS,
        "FROM amenities ORDER BY COSINE_DISTANCE(embedding, @query) LIMIT @top_k",
    )
}

fn get_flight_sql() -> String {
    select(&FLIGHT_COLUMNS, "FROM flights WHERE id = @id")
}

fn search_flights_by_number_sql() -> String {
    select(
        &FLIGHT_COLUMNS,
        "FROM flights WHERE airline = @airline AND flight_number = @number \
         ORDER BY id LIMIT @limit",
    )
}

fn search_flights_by_airports_sql() -> String {
    select(
        &FLIGHT_COLUMNS,
        "FROM flights \
         WHERE (@departure IS NULL OR LOWER(departure_airport) LIKE @departure) \
           AND (@arrival IS NULL OR LOWER(arrival_airport) LIKE @arrival) \
           AND departure_time >= @start AND departure_time < @end \
         ORDER BY id LIMIT @limit",
    )
}

fn validate_ticket_sql() -> String {
    select(
        &FLIGHT_COLUMNS,
        "FROM flights \
         WHERE LOWER(airline) = LOWER(@airline) \
           AND LOWER(flight_number) = LOWER(@flight_number) \
           AND LOWER(departure_airport) = LOWER(@departure_airport) \
           AND departure_time = @departure_time \
         ORDER BY id LIMIT 1",
    )
}

fn list_tickets_sql() -> String {
    select(&TICKET_COLUMNS, "FROM tickets WHERE user_id = @user_id")
}

const POLICIES_SEARCH: &str =
    "SELECT content FROM policies ORDER BY COSINE_DISTANCE(embedding, @query) LIMIT @top_k";

fn export_sql(columns: &[&str], table: &str) -> String {
    select(columns, &format!("FROM {} ORDER BY id ASC", table))
}

fn spanner_error(e: impl std::fmt::Display) -> DatastoreError {
    DatastoreError::Spanner(e.to_string())
}

// ----------------------------------------------------------------------------
// Client
// ----------------------------------------------------------------------------

/// Cloud Spanner client.
///
/// Queries run in single-use read-only transactions; writes are committed
/// with `apply`. The session client is released on [`Client::close`].
pub struct SpannerClient {
    session: Mutex<Option<SessionClient>>,
    admin: AdminClient,
    database: String,
}

impl SpannerClient {
    /// Connects both the session and the admin client, then checks that the
    /// database answers.
    pub async fn connect(config: SpannerConfig) -> Result<Self> {
        let database = config.database_path();
        info!(%database, "Connecting to Cloud Spanner");

        let (client_config, admin_config) = match &config.service_account_key_file {
            Some(path) => {
                let credentials = CredentialsFile::new_from_file(path.clone())
                    .await
                    .map_err(spanner_error)?;
                (
                    ClientConfig::default()
                        .with_credentials(credentials.clone())
                        .await
                        .map_err(spanner_error)?,
                    AdminClientConfig::default()
                        .with_credentials(credentials)
                        .await
                        .map_err(spanner_error)?,
                )
            }
            None => (
                ClientConfig::default().with_auth().await.map_err(spanner_error)?,
                AdminClientConfig::default().with_auth().await.map_err(spanner_error)?,
            ),
        };

        let session = SessionClient::new(&database, client_config)
            .await
            .map_err(spanner_error)?;
        let admin = AdminClient::new(admin_config).await.map_err(spanner_error)?;

        let client = Self {
            session: Mutex::new(Some(session)),
            admin,
            database,
        };
        client.query(Statement::new("SELECT 1"), |_| Ok(())).await?;
        info!(database = %client.database, "Connected to Cloud Spanner");
        Ok(client)
    }

    fn session(&self) -> Result<SessionClient> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DatastoreError::Closed)
    }

    async fn query<T>(&self, stmt: Statement, decode: fn(&Row) -> Result<T>) -> Result<Vec<T>> {
        let session = self.session()?;
        let mut tx = session.single().await.map_err(spanner_error)?;
        let mut rows = tx.query(stmt).await.map_err(spanner_error)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(spanner_error)? {
            out.push(decode(&row)?);
        }
        Ok(out)
    }

    async fn query_opt<T>(
        &self,
        stmt: Statement,
        decode: fn(&Row) -> Result<T>,
    ) -> Result<Option<T>> {
        Ok(self.query(stmt, decode).await?.into_iter().next())
    }

    /// Commits `mutations` in chunks of [`BATCH_SIZE`].
    async fn apply_batched(&self, table: &str, mutations: Vec<Mutation>) -> Result<()> {
        let session = self.session()?;
        let total = mutations.len();
        let mut pending = mutations.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<Mutation> = pending.by_ref().take(BATCH_SIZE).collect();
            session.apply(batch).await.map_err(spanner_error)?;
        }
        debug!(table, count = total, "Inserted rows");
        Ok(())
    }

    async fn update_schema(&self) -> Result<()> {
        let request = UpdateDatabaseDdlRequest {
            database: self.database.clone(),
            statements: schema_statements(),
            ..Default::default()
        };
        let mut operation = self
            .admin
            .database()
            .update_database_ddl(request, None)
            .await
            .map_err(spanner_error)?;
        info!("Waiting for schema update to complete");
        operation.wait(None).await.map_err(spanner_error)?;
        debug!("Recreated tables");
        Ok(())
    }
}

/// Registry constructor for [`Kind::SpannerGsql`].
pub fn create(config: DatastoreConfig) -> BoxFuture<'static, Result<Box<dyn Client>>> {
    Box::pin(async move {
        match config {
            DatastoreConfig::SpannerGsql(config) => {
                let client = SpannerClient::connect(config).await?;
                Ok(Box::new(client) as Box<dyn Client>)
            }
            other => Err(config_mismatch(Kind::SpannerGsql, &other)),
        }
    })
}

// ----------------------------------------------------------------------------
// Row encoding and decoding
// ----------------------------------------------------------------------------

fn column<T: TryFromValue>(row: &Row, name: &str) -> Result<T> {
    row.column_by_name::<T>(name)
        .map_err(|e| DatastoreError::Decode(format!("column '{}': {}", name, e)))
}

fn timestamp_column(row: &Row, name: &str) -> Result<NaiveDateTime> {
    parse_timestamp(&column::<String>(row, name)?)
}

fn embedding_column(row: &Row) -> Result<Embedding> {
    Embedding::try_from(column::<Vec<f64>>(row, "embedding")?)
}

fn airport_from_row(row: &Row) -> Result<Airport> {
    Ok(Airport {
        id: column(row, "id")?,
        iata: column(row, "iata")?,
        name: column(row, "name")?,
        city: column(row, "city")?,
        country: column(row, "country")?,
    })
}

fn amenity_from_row(row: &Row) -> Result<Amenity> {
    let mut hours = [None; 14];
    for (slot, name) in hours.iter_mut().zip(WEEKLY_HOUR_COLUMNS) {
        *slot = column::<Option<String>>(row, name)?
            .as_deref()
            .map(parse_time_of_day)
            .transpose()?;
    }

    Ok(Amenity::from_parts(
        column(row, "id")?,
        column(row, "name")?,
        column(row, "description")?,
        column(row, "location")?,
        column(row, "terminal")?,
        column(row, "category")?,
        column(row, "hour")?,
        hours,
        column(row, "content")?,
        embedding_column(row)?,
    ))
}

fn flight_from_row(row: &Row) -> Result<Flight> {
    Ok(Flight {
        id: column(row, "id")?,
        airline: column(row, "airline")?,
        flight_number: column(row, "flight_number")?,
        departure_airport: column(row, "departure_airport")?,
        arrival_airport: column(row, "arrival_airport")?,
        departure_time: timestamp_column(row, "departure_time")?,
        arrival_time: timestamp_column(row, "arrival_time")?,
        departure_gate: column(row, "departure_gate")?,
        arrival_gate: column(row, "arrival_gate")?,
    })
}

fn ticket_from_row(row: &Row) -> Result<Ticket> {
    Ok(Ticket {
        user_id: column(row, "user_id")?,
        user_name: column(row, "user_name")?,
        user_email: column(row, "user_email")?,
        airline: column(row, "airline")?,
        flight_number: column(row, "flight_number")?,
        departure_airport: column(row, "departure_airport")?,
        arrival_airport: column(row, "arrival_airport")?,
        departure_time: timestamp_column(row, "departure_time")?,
        arrival_time: timestamp_column(row, "arrival_time")?,
    })
}

fn policy_from_row(row: &Row) -> Result<Policy> {
    Ok(Policy {
        id: column(row, "id")?,
        content: column(row, "content")?,
        embedding: embedding_column(row)?,
    })
}

fn airport_mutation(a: &Airport) -> Mutation {
    insert(
        "airports",
        &AIRPORT_COLUMNS,
        &[&a.id, &a.iata, &a.name, &a.city, &a.country],
    )
}

/// Opening hours in column order, as stored `HH:MM:SS` strings.
fn hour_values(a: &Amenity) -> Vec<Option<String>> {
    a.weekly_hours()
        .iter()
        .map(|t| t.as_ref().map(format_time_of_day))
        .collect()
}

fn amenity_mutation(a: &Amenity) -> Mutation {
    let hours = hour_values(a);
    let embedding = a.embedding.to_f64_vec();

    let mut values: Vec<&dyn ToKind> = vec![
        &a.id,
        &a.name,
        &a.description,
        &a.location,
        &a.terminal,
        &a.category,
        &a.hour,
    ];
    values.extend(hours.iter().map(|h| h as &dyn ToKind));
    values.push(&a.content);
    values.push(&embedding);
    insert("amenities", &AMENITY_COLUMNS, &values)
}

fn flight_mutation(f: &Flight) -> Mutation {
    let departure = format_timestamp(&f.departure_time);
    let arrival = format_timestamp(&f.arrival_time);
    insert(
        "flights",
        &FLIGHT_COLUMNS,
        &[
            &f.id,
            &f.airline,
            &f.flight_number,
            &f.departure_airport,
            &f.arrival_airport,
            &departure,
            &arrival,
            &f.departure_gate,
            &f.arrival_gate,
        ],
    )
}

fn ticket_mutation(t: &Ticket) -> Mutation {
    let departure = format_timestamp(&t.departure_time);
    let arrival = format_timestamp(&t.arrival_time);
    insert(
        "tickets",
        &TICKET_COLUMNS,
        &[
            &t.user_id,
            &t.user_name,
            &t.user_email,
            &t.airline,
            &t.flight_number,
            &t.departure_airport,
            &t.arrival_airport,
            &departure,
            &arrival,
        ],
    )
}

fn policy_mutation(p: &Policy) -> Mutation {
    let embedding = p.embedding.to_f64_vec();
    insert("policies", &POLICY_COLUMNS, &[&p.id, &p.content, &embedding])
}

// ----------------------------------------------------------------------------
// Contract
// ----------------------------------------------------------------------------

#[async_trait]
impl AirportStore for SpannerClient {
    async fn get_airport_by_id(&self, id: i64) -> Result<QueryOutput<Option<Airport>>> {
        let sql = get_airport_by_id_sql();
        let mut stmt = Statement::new(&sql);
        stmt.add_param("id", &id);
        let airport = self.query_opt(stmt, airport_from_row).await?;
        Ok(QueryOutput::new(airport, Some(sql)))
    }

    async fn get_airport_by_iata(&self, iata: &str) -> Result<QueryOutput<Option<Airport>>> {
        let sql = get_airport_by_iata_sql();
        let mut stmt = Statement::new(&sql);
        stmt.add_param("iata", &iata.to_string());
        let airport = self.query_opt(stmt, airport_from_row).await?;
        Ok(QueryOutput::new(airport, Some(sql)))
    }

    async fn search_airports(
        &self,
        country: Option<&str>,
        city: Option<&str>,
        name: Option<&str>,
    ) -> Result<QueryOutput<Vec<Airport>>> {
        let sql = search_airports_sql();
        let mut stmt = Statement::new(&sql);
        stmt.add_param("country", &country.map(contains_pattern));
        stmt.add_param("city", &city.map(contains_pattern));
        stmt.add_param("name", &name.map(contains_pattern));
        stmt.add_param("limit", &SEARCH_LIMIT);
        let airports = self.query(stmt, airport_from_row).await?;
        Ok(QueryOutput::new(airports, Some(sql)))
    }
}

#[async_trait]
impl AmenityStore for SpannerClient {
    async fn get_amenity(&self, id: i64) -> Result<QueryOutput<Option<Amenity>>> {
        let sql = get_amenity_sql();
        let mut stmt = Statement::new(&sql);
        stmt.add_param("id", &id);
        let amenity = self.query_opt(stmt, amenity_from_row).await?;
        Ok(QueryOutput::new(amenity, Some(sql)))
    }

    async fn amenities_search(
        &self,
        query: &Embedding,
        _similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<Amenity>>> {
        let sql = amenities_search_sql();
        if top_k == 0 {
            return Ok(QueryOutput::new(Vec::new(), Some(sql)));
        }
        let mut stmt = Statement::new(&sql);
        stmt.add_param("query", &query.to_f64_vec());
        stmt.add_param("top_k", &limit_param(top_k));
        let amenities = self.query(stmt, amenity_from_row).await?;
        Ok(QueryOutput::new(amenities, Some(sql)))
    }
}

#[async_trait]
impl FlightStore for SpannerClient {
    async fn get_flight(&self, id: i64) -> Result<QueryOutput<Option<Flight>>> {
        let sql = get_flight_sql();
        let mut stmt = Statement::new(&sql);
        stmt.add_param("id", &id);
        let flight = self.query_opt(stmt, flight_from_row).await?;
        Ok(QueryOutput::new(flight, Some(sql)))
    }

    async fn search_flights_by_number(
        &self,
        airline: &str,
        number: &str,
    ) -> Result<QueryOutput<Vec<Flight>>> {
        let sql = search_flights_by_number_sql();
        let mut stmt = Statement::new(&sql);
        stmt.add_param("airline", &airline.to_string());
        stmt.add_param("number", &number.to_string());
        stmt.add_param("limit", &SEARCH_LIMIT);
        let flights = self.query(stmt, flight_from_row).await?;
        Ok(QueryOutput::new(flights, Some(sql)))
    }

    async fn search_flights_by_airports(
        &self,
        date: NaiveDate,
        departure_airport: Option<&str>,
        arrival_airport: Option<&str>,
    ) -> Result<QueryOutput<Vec<Flight>>> {
        let sql = search_flights_by_airports_sql();
        let (start, end) = day_window(date);
        let mut stmt = Statement::new(&sql);
        stmt.add_param("departure", &departure_airport.map(contains_pattern));
        stmt.add_param("arrival", &arrival_airport.map(contains_pattern));
        stmt.add_param("start", &format_timestamp(&start));
        stmt.add_param("end", &format_timestamp(&end));
        stmt.add_param("limit", &SEARCH_LIMIT);
        let flights = self.query(stmt, flight_from_row).await?;
        Ok(QueryOutput::new(flights, Some(sql)))
    }
}

#[async_trait]
impl TicketStore for SpannerClient {
    async fn validate_ticket(
        &self,
        airline: &str,
        flight_number: &str,
        departure_airport: &str,
        departure_time: NaiveDateTime,
    ) -> Result<QueryOutput<Option<Flight>>> {
        let sql = validate_ticket_sql();
        let mut stmt = Statement::new(&sql);
        stmt.add_param("airline", &airline.to_string());
        stmt.add_param("flight_number", &flight_number.to_string());
        stmt.add_param("departure_airport", &departure_airport.to_string());
        stmt.add_param("departure_time", &format_timestamp(&departure_time));
        let flight = self.query_opt(stmt, flight_from_row).await?;
        Ok(QueryOutput::new(flight, Some(sql)))
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.session()?
            .apply(vec![ticket_mutation(ticket)])
            .await
            .map_err(spanner_error)?;
        debug!(user_id = %ticket.user_id, "Inserted ticket");
        Ok(())
    }

    async fn list_tickets(&self, user_id: &str) -> Result<QueryOutput<Vec<Ticket>>> {
        let sql = list_tickets_sql();
        let mut stmt = Statement::new(&sql);
        stmt.add_param("user_id", &user_id.to_string());
        let tickets = self.query(stmt, ticket_from_row).await?;
        Ok(QueryOutput::new(tickets, Some(sql)))
    }
}

#[async_trait]
impl PolicyStore for SpannerClient {
    async fn policies_search(
        &self,
        query: &Embedding,
        _similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<String>>> {
        if top_k == 0 {
            return Ok(QueryOutput::with_sql(Vec::new(), POLICIES_SEARCH));
        }
        let mut stmt = Statement::new(POLICIES_SEARCH);
        stmt.add_param("query", &query.to_f64_vec());
        stmt.add_param("top_k", &limit_param(top_k));
        let contents = self
            .query(stmt, |row| column::<String>(row, "content"))
            .await?;
        Ok(QueryOutput::with_sql(contents, POLICIES_SEARCH))
    }
}

#[async_trait]
impl Client for SpannerClient {
    fn kind(&self) -> Kind {
        Kind::SpannerGsql
    }

    fn airports(&self) -> Option<&dyn AirportStore> {
        Some(self)
    }

    fn amenities(&self) -> Option<&dyn AmenityStore> {
        Some(self)
    }

    fn flights(&self) -> Option<&dyn FlightStore> {
        Some(self)
    }

    fn tickets(&self) -> Option<&dyn TicketStore> {
        Some(self)
    }

    fn policies(&self) -> Option<&dyn PolicyStore> {
        Some(self)
    }

    /// Recreates every table in one DDL batch, then loads each family.
    ///
    /// Mutation batches commit independently, so a failure part-way leaves
    /// the earlier batches in place.
    async fn initialize_data(&self, dataset: &Dataset) -> Result<()> {
        lifecycle::ensure_supported(self.kind(), self.capabilities(), dataset)?;
        self.session()?;

        self.update_schema().await?;

        self.apply_batched("airports", dataset.airports.iter().map(airport_mutation).collect())
            .await?;
        self.apply_batched("amenities", dataset.amenities.iter().map(amenity_mutation).collect())
            .await?;
        self.apply_batched("flights", dataset.flights.iter().map(flight_mutation).collect())
            .await?;
        self.apply_batched("policies", dataset.policies.iter().map(policy_mutation).collect())
            .await?;
        Ok(())
    }

    async fn export_data(&self) -> Result<Dataset> {
        let airports = self
            .query(
                Statement::new(export_sql(&AIRPORT_COLUMNS, "airports")),
                airport_from_row,
            )
            .await?;
        let amenities = self
            .query(
                Statement::new(export_sql(&AMENITY_COLUMNS, "amenities")),
                amenity_from_row,
            )
            .await?;
        let flights = self
            .query(
                Statement::new(export_sql(&FLIGHT_COLUMNS, "flights")),
                flight_from_row,
            )
            .await?;
        let policies = self
            .query(
                Statement::new(export_sql(&POLICY_COLUMNS, "policies")),
                policy_from_row,
            )
            .await?;

        Ok(Dataset {
            airports,
            amenities,
            flights,
            policies,
        })
    }

    async fn close(&self) {
        let Some(session) = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            warn!("Spanner sessions already released");
            return;
        };
        session.close().await;
        info!(database = %self.database, "Spanner sessions released");
    }
}
