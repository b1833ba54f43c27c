//! Cloud SQL for MySQL backend.
//!
//! The `mysql` driver is blocking, so this backend comes in two halves:
//!
//! - [`MysqlCore`] runs each operation synchronously on a pooled connection.
//! - [`MysqlClient`] implements the async contract by handing every call to
//!   a [`WorkerPool`] and awaiting the result.
//!
//! Similarity search uses Cloud SQL's vector extension:
//! `NEAREST(embedding) TO (string_to_vector(:query), 'num_neighbors=<k>')`.
//! Vector indexes block schema changes on their tables, so they are dropped
//! before every bulk load and again when the client closes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::future::BoxFuture;
use mysql::prelude::{FromValue, Queryable};
use mysql::{params, OptsBuilder, Params, Pool, PooledConn, Row, Value};
use tracing::{debug, error, info, warn};

use super::{config_mismatch, contains_pattern, limit_param};
use crate::config::{DatastoreConfig, MysqlConfig};
use crate::datastore::bridge::{self, WorkerPool};
use crate::datastore::lifecycle::{VectorIndex, VECTOR_INDEXES};
use crate::datastore::{
    AirportStore, AmenityStore, Client, FlightStore, Kind, PolicyStore, QueryOutput, TicketStore,
    SEARCH_LIMIT,
};
use crate::error::{DatastoreError, Result};
use crate::models::time::{day_window, format_time_of_day, format_timestamp};
use crate::models::{
    time, Airport, Amenity, Dataset, Embedding, Flight, Policy, Ticket, WEEKLY_HOUR_COLUMNS,
};

// ----------------------------------------------------------------------------
// Statements
// ----------------------------------------------------------------------------

macro_rules! airport_columns {
    () => {
        "id, iata, name, city, country"
    };
}

macro_rules! amenity_columns {
    () => {
        "id, name, description, location, terminal, category, hour, \
         sunday_start_hour, sunday_end_hour, monday_start_hour, monday_end_hour, \
         tuesday_start_hour, tuesday_end_hour, wednesday_start_hour, wednesday_end_hour, \
         thursday_start_hour, thursday_end_hour, friday_start_hour, friday_end_hour, \
         saturday_start_hour, saturday_end_hour, content, \
         vector_to_string(embedding) AS embedding"
    };
}

macro_rules! flight_columns {
    () => {
        "id, airline, flight_number, departure_airport, arrival_airport, \
         departure_time, arrival_time, departure_gate, arrival_gate"
    };
}

macro_rules! ticket_columns {
    () => {
        "user_id, user_name, user_email, airline, flight_number, \
         departure_airport, arrival_airport, departure_time, arrival_time"
    };
}

const CREATE_AIRPORTS: &str = "
    CREATE TABLE airports(
      id BIGINT PRIMARY KEY,
      iata TEXT,
      name TEXT,
      city TEXT,
      country TEXT
    )";

const CREATE_AMENITIES: &str = "
    CREATE TABLE amenities(
      id BIGINT PRIMARY KEY,
      name TEXT,
      description TEXT,
      location TEXT,
      terminal TEXT,
      category TEXT,
      hour TEXT,
      sunday_start_hour TIME,
      sunday_end_hour TIME,
      monday_start_hour TIME,
      monday_end_hour TIME,
      tuesday_start_hour TIME,
      tuesday_end_hour TIME,
      wednesday_start_hour TIME,
      wednesday_end_hour TIME,
      thursday_start_hour TIME,
      thursday_end_hour TIME,
      friday_start_hour TIME,
      friday_end_hour TIME,
      saturday_start_hour TIME,
      saturday_end_hour TIME,
      content TEXT NOT NULL,
      embedding vector(768) USING VARBINARY NOT NULL
    )";

const CREATE_FLIGHTS: &str = "
    CREATE TABLE flights(
      id BIGINT PRIMARY KEY,
      airline TEXT,
      flight_number TEXT,
      departure_airport TEXT,
      arrival_airport TEXT,
      departure_time DATETIME(6),
      arrival_time DATETIME(6),
      departure_gate TEXT,
      arrival_gate TEXT
    )";

const CREATE_TICKETS: &str = "
    CREATE TABLE tickets(
      user_id TEXT,
      user_name TEXT,
      user_email TEXT,
      airline TEXT,
      flight_number TEXT,
      departure_airport TEXT,
      arrival_airport TEXT,
      departure_time DATETIME(6),
      arrival_time DATETIME(6)
    )";

const CREATE_POLICIES: &str = "
    CREATE TABLE policies(
      id BIGINT PRIMARY KEY,
      content TEXT NOT NULL,
      embedding vector(768) USING VARBINARY NOT NULL
    )";

const INSERT_AIRPORT: &str = concat!(
    "INSERT INTO airports (",
    airport_columns!(),
    ") VALUES (?, ?, ?, ?, ?)"
);

const INSERT_AMENITY: &str = "
    INSERT INTO amenities VALUES (?, ?, ?, ?, ?, ?, ?,
      ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
      ?, string_to_vector(?))";

const INSERT_FLIGHT: &str = concat!(
    "INSERT INTO flights (",
    flight_columns!(),
    ") VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
);

const INSERT_TICKET: &str = concat!(
    "INSERT INTO tickets (",
    ticket_columns!(),
    ") VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
);

const INSERT_POLICY: &str = "INSERT INTO policies VALUES (?, ?, string_to_vector(?))";

/// Tables in the order a bulk load recreates them.
const TABLES: [(&str, &str); 5] = [
    ("airports", CREATE_AIRPORTS),
    ("amenities", CREATE_AMENITIES),
    ("flights", CREATE_FLIGHTS),
    ("tickets", CREATE_TICKETS),
    ("policies", CREATE_POLICIES),
];

fn create_index_statement(database: &str, index: &VectorIndex) -> String {
    format!(
        "CALL mysql.create_vector_index('{}', '{}.{}', '{}', '')",
        index.name,
        quote_escape(database),
        index.table,
        index.column
    )
}

fn drop_index_statement(database: &str, index: &VectorIndex) -> String {
    format!(
        "CALL mysql.drop_vector_index('{}.{}')",
        quote_escape(database),
        index.name
    )
}

fn quote_escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Option string for `NEAREST ... TO (vector, options)`.
fn search_options(top_k: usize) -> String {
    format!("num_neighbors={}", top_k)
}

// ----------------------------------------------------------------------------
// Blocking core
// ----------------------------------------------------------------------------

/// Synchronous MySQL operations over a shared connection pool.
///
/// Every method blocks the calling thread; call them through
/// [`MysqlClient`] from async code.
pub struct MysqlCore {
    pool: Mutex<Option<Pool>>,
    database: String,
    indexes_built: AtomicBool,
}

impl MysqlCore {
    /// Opens the pool and checks that the database answers.
    pub fn connect(config: &MysqlConfig) -> Result<Self> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(config.database.clone()));

        let pool = Pool::new(opts)?;
        pool.get_conn()?.query_drop("SELECT 1")?;

        info!(
            instance = %config.connection_name(),
            database = %config.database,
            "Connected to Cloud SQL for MySQL"
        );

        Ok(Self {
            pool: Mutex::new(Some(pool)),
            database: config.database.clone(),
            indexes_built: AtomicBool::new(false),
        })
    }

    fn conn(&self) -> Result<PooledConn> {
        let pool = self
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DatastoreError::Closed)?;
        Ok(pool.get_conn()?)
    }

    // ========================================================================
    // Airports
    // ========================================================================

    pub fn get_airport_by_id(&self, id: i64) -> Result<Option<Airport>> {
        let row: Option<Row> = self.conn()?.exec_first(
            concat!("SELECT ", airport_columns!(), " FROM airports WHERE id = :id"),
            params! { "id" => id },
        )?;
        row.map(airport_from_row).transpose()
    }

    pub fn get_airport_by_iata(&self, iata: &str) -> Result<Option<Airport>> {
        let row: Option<Row> = self.conn()?.exec_first(
            concat!(
                "SELECT ",
                airport_columns!(),
                " FROM airports WHERE LOWER(iata) = LOWER(:iata) ORDER BY id LIMIT 1"
            ),
            params! { "iata" => iata },
        )?;
        row.map(airport_from_row).transpose()
    }

    pub fn search_airports(
        &self,
        country: Option<&str>,
        city: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<Airport>> {
        let rows: Vec<Row> = self.conn()?.exec(
            concat!(
                "SELECT ",
                airport_columns!(),
                " FROM airports
                 WHERE (:country IS NULL OR LOWER(country) LIKE :country)
                   AND (:city IS NULL OR LOWER(city) LIKE :city)
                   AND (:name IS NULL OR LOWER(name) LIKE :name)
                 ORDER BY id LIMIT :limit"
            ),
            params! {
                "country" => country.map(contains_pattern),
                "city" => city.map(contains_pattern),
                "name" => name.map(contains_pattern),
                "limit" => SEARCH_LIMIT
            },
        )?;
        rows.into_iter().map(airport_from_row).collect()
    }

    // ========================================================================
    // Amenities
    // ========================================================================

    pub fn get_amenity(&self, id: i64) -> Result<Option<Amenity>> {
        let row: Option<Row> = self.conn()?.exec_first(
            concat!("SELECT ", amenity_columns!(), " FROM amenities WHERE id = :id"),
            params! { "id" => id },
        )?;
        row.map(amenity_from_row).transpose()
    }

    pub fn amenities_search(&self, query: &Embedding, top_k: usize) -> Result<Vec<Amenity>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let rows: Vec<Row> = self.conn()?.exec(
            concat!(
                "SELECT ",
                amenity_columns!(),
                " FROM amenities
                 WHERE NEAREST(embedding) TO (string_to_vector(:query), :search_options)
                 ORDER BY cosine_distance(embedding, string_to_vector(:query))
                 LIMIT :top_k"
            ),
            params! {
                "query" => query.to_vector_string(),
                "search_options" => search_options(top_k),
                "top_k" => limit_param(top_k)
            },
        )?;
        rows.into_iter().map(amenity_from_row).collect()
    }

    // ========================================================================
    // Flights
    // ========================================================================

    pub fn get_flight(&self, id: i64) -> Result<Option<Flight>> {
        let row: Option<Row> = self.conn()?.exec_first(
            concat!("SELECT ", flight_columns!(), " FROM flights WHERE id = :id"),
            params! { "id" => id },
        )?;
        row.map(flight_from_row).transpose()
    }

    pub fn search_flights_by_number(&self, airline: &str, number: &str) -> Result<Vec<Flight>> {
        let rows: Vec<Row> = self.conn()?.exec(
            concat!(
                "SELECT ",
                flight_columns!(),
                " FROM flights
                 WHERE airline = :airline AND flight_number = :number
                 ORDER BY id LIMIT :limit"
            ),
            params! { "airline" => airline, "number" => number, "limit" => SEARCH_LIMIT },
        )?;
        rows.into_iter().map(flight_from_row).collect()
    }

    pub fn search_flights_by_airports(
        &self,
        date: NaiveDate,
        departure_airport: Option<&str>,
        arrival_airport: Option<&str>,
    ) -> Result<Vec<Flight>> {
        let (start, end) = day_window(date);
        let rows: Vec<Row> = self.conn()?.exec(
            concat!(
                "SELECT ",
                flight_columns!(),
                " FROM flights
                 WHERE (:departure IS NULL OR LOWER(departure_airport) LIKE :departure)
                   AND (:arrival IS NULL OR LOWER(arrival_airport) LIKE :arrival)
                   AND departure_time >= :start
                   AND departure_time < :end
                 ORDER BY id LIMIT :limit"
            ),
            params! {
                "departure" => departure_airport.map(contains_pattern),
                "arrival" => arrival_airport.map(contains_pattern),
                "start" => format_timestamp(&start),
                "end" => format_timestamp(&end),
                "limit" => SEARCH_LIMIT
            },
        )?;
        rows.into_iter().map(flight_from_row).collect()
    }

    // ========================================================================
    // Tickets
    // ========================================================================

    pub fn validate_ticket(
        &self,
        airline: &str,
        flight_number: &str,
        departure_airport: &str,
        departure_time: NaiveDateTime,
    ) -> Result<Option<Flight>> {
        let row: Option<Row> = self.conn()?.exec_first(
            concat!(
                "SELECT ",
                flight_columns!(),
                " FROM flights
                 WHERE LOWER(airline) = LOWER(:airline)
                   AND LOWER(flight_number) = LOWER(:flight_number)
                   AND LOWER(departure_airport) = LOWER(:departure_airport)
                   AND departure_time = :departure_time
                 ORDER BY id LIMIT 1"
            ),
            params! {
                "airline" => airline,
                "flight_number" => flight_number,
                "departure_airport" => departure_airport,
                "departure_time" => format_timestamp(&departure_time)
            },
        )?;
        row.map(flight_from_row).transpose()
    }

    pub fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.conn()?.exec_drop(INSERT_TICKET, ticket_params(ticket))?;
        Ok(())
    }

    pub fn list_tickets(&self, user_id: &str) -> Result<Vec<Ticket>> {
        let rows: Vec<Row> = self.conn()?.exec(
            concat!(
                "SELECT ",
                ticket_columns!(),
                " FROM tickets WHERE user_id = :user_id"
            ),
            params! { "user_id" => user_id },
        )?;
        rows.into_iter().map(ticket_from_row).collect()
    }

    // ========================================================================
    // Policies
    // ========================================================================

    pub fn policies_search(&self, query: &Embedding, top_k: usize) -> Result<Vec<String>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let rows: Vec<Row> = self.conn()?.exec(
            "SELECT content
               FROM policies
              WHERE NEAREST(embedding) TO (string_to_vector(:query), :search_options)
              ORDER BY cosine_distance(embedding, string_to_vector(:query))
              LIMIT :top_k",
            params! {
                "query" => query.to_vector_string(),
                "search_options" => search_options(top_k),
                "top_k" => limit_param(top_k)
            },
        )?;
        rows.into_iter()
            .map(|mut row| take::<String>(&mut row, "content"))
            .collect()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Recreates every table from `dataset`, then builds the vector indexes.
    pub fn initialize_data(&self, dataset: &Dataset) -> Result<()> {
        let mut conn = self.conn()?;

        self.drop_indexes_before_load(&mut conn)?;

        for (table, create) in TABLES {
            conn.query_drop(format!("DROP TABLE IF EXISTS {}", table))?;
            conn.query_drop(create)?;
        }
        debug!("Recreated tables");

        conn.exec_batch(INSERT_AIRPORT, dataset.airports.iter().map(airport_params))?;
        debug!(count = dataset.airports.len(), "Inserted airports");
        conn.exec_batch(INSERT_AMENITY, dataset.amenities.iter().map(amenity_params))?;
        debug!(count = dataset.amenities.len(), "Inserted amenities");
        conn.exec_batch(INSERT_FLIGHT, dataset.flights.iter().map(flight_params))?;
        debug!(count = dataset.flights.len(), "Inserted flights");
        conn.exec_batch(INSERT_POLICY, dataset.policies.iter().map(policy_params))?;
        debug!(count = dataset.policies.len(), "Inserted policies");

        for index in &VECTOR_INDEXES {
            conn.query_drop(create_index_statement(&self.database, index))?;
            info!(index = index.name, table = index.table, "Created vector index");
        }
        self.indexes_built.store(true, Ordering::SeqCst);

        Ok(())
    }

    /// Drops the vector indexes so the tables can be recreated.
    ///
    /// Failures are fatal only for indexes this client built; otherwise the
    /// index usually does not exist and the failure is ignored.
    fn drop_indexes_before_load(&self, conn: &mut PooledConn) -> Result<()> {
        let owned = self.indexes_built.swap(false, Ordering::SeqCst);
        for index in &VECTOR_INDEXES {
            match conn.query_drop(drop_index_statement(&self.database, index)) {
                Ok(()) => debug!(index = index.name, "Dropped vector index"),
                Err(e) if owned => return Err(e.into()),
                Err(e) => debug!(index = index.name, error = %e, "No vector index to drop"),
            }
        }
        Ok(())
    }

    pub fn export_data(&self) -> Result<Dataset> {
        let mut conn = self.conn()?;

        let airports: Vec<Row> = conn.exec(
            concat!("SELECT ", airport_columns!(), " FROM airports ORDER BY id ASC"),
            (),
        )?;
        let amenities: Vec<Row> = conn.exec(
            concat!("SELECT ", amenity_columns!(), " FROM amenities ORDER BY id ASC"),
            (),
        )?;
        let flights: Vec<Row> = conn.exec(
            concat!("SELECT ", flight_columns!(), " FROM flights ORDER BY id ASC"),
            (),
        )?;
        let policies: Vec<Row> = conn.exec(
            "SELECT id, content, vector_to_string(embedding) AS embedding
               FROM policies ORDER BY id ASC",
            (),
        )?;

        Ok(Dataset {
            airports: airports.into_iter().map(airport_from_row).collect::<Result<_>>()?,
            amenities: amenities.into_iter().map(amenity_from_row).collect::<Result<_>>()?,
            flights: flights.into_iter().map(flight_from_row).collect::<Result<_>>()?,
            policies: policies.into_iter().map(policy_from_row).collect::<Result<_>>()?,
        })
    }

    /// Drops both vector indexes, then disposes of the pool.
    ///
    /// Errors are logged; the pool is released regardless.
    pub fn close(&self) {
        let Some(pool) = self
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            warn!("MySQL pool already disposed");
            return;
        };

        match pool.get_conn() {
            Ok(mut conn) => {
                for index in &VECTOR_INDEXES {
                    match conn.query_drop(drop_index_statement(&self.database, index)) {
                        Ok(()) => debug!(index = index.name, "Dropped vector index"),
                        Err(e) => error!(index = index.name, error = %e, "Failed to drop vector index"),
                    }
                }
            }
            Err(e) => error!(error = %e, "Failed to get connection to drop vector indexes"),
        }
        self.indexes_built.store(false, Ordering::SeqCst);

        drop(pool);
        info!(database = %self.database, "MySQL pool disposed");
    }
}

// ----------------------------------------------------------------------------
// Row encoding and decoding
// ----------------------------------------------------------------------------

fn airport_params(a: &Airport) -> Params {
    Params::Positional(vec![
        Value::from(a.id),
        Value::from(a.iata.as_str()),
        Value::from(a.name.as_str()),
        Value::from(a.city.as_str()),
        Value::from(a.country.as_str()),
    ])
}

fn amenity_params(a: &Amenity) -> Params {
    let mut values = vec![
        Value::from(a.id),
        Value::from(a.name.as_str()),
        Value::from(a.description.as_str()),
        Value::from(a.location.as_str()),
        Value::from(a.terminal.as_str()),
        Value::from(a.category.as_str()),
        Value::from(a.hour.as_str()),
    ];
    values.extend(a.weekly_hours().iter().map(time_value));
    values.push(Value::from(a.content.as_str()));
    values.push(Value::from(a.embedding.to_vector_string()));
    Params::Positional(values)
}

fn flight_params(f: &Flight) -> Params {
    Params::Positional(vec![
        Value::from(f.id),
        Value::from(f.airline.as_str()),
        Value::from(f.flight_number.as_str()),
        Value::from(f.departure_airport.as_str()),
        Value::from(f.arrival_airport.as_str()),
        Value::from(format_timestamp(&f.departure_time)),
        Value::from(format_timestamp(&f.arrival_time)),
        Value::from(f.departure_gate.as_str()),
        Value::from(f.arrival_gate.as_str()),
    ])
}

fn ticket_params(t: &Ticket) -> Params {
    Params::Positional(vec![
        Value::from(t.user_id.as_str()),
        Value::from(t.user_name.as_str()),
        Value::from(t.user_email.as_str()),
        Value::from(t.airline.as_str()),
        Value::from(t.flight_number.as_str()),
        Value::from(t.departure_airport.as_str()),
        Value::from(t.arrival_airport.as_str()),
        Value::from(format_timestamp(&t.departure_time)),
        Value::from(format_timestamp(&t.arrival_time)),
    ])
}

fn policy_params(p: &Policy) -> Params {
    Params::Positional(vec![
        Value::from(p.id),
        Value::from(p.content.as_str()),
        Value::from(p.embedding.to_vector_string()),
    ])
}

fn time_value(time: &Option<NaiveTime>) -> Value {
    match time {
        Some(t) => Value::from(format_time_of_day(t)),
        None => Value::NULL,
    }
}

fn take<T: FromValue>(row: &mut Row, column: &str) -> Result<T> {
    match row.take_opt::<T, _>(column) {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(DatastoreError::Decode(format!("column '{}': {}", column, e))),
        None => Err(DatastoreError::Decode(format!("missing column '{}'", column))),
    }
}

/// Decodes DATETIME values from both the binary and the text protocol.
fn datetime_from_value(value: Value, column: &str) -> Result<NaiveDateTime> {
    match value {
        Value::Date(year, month, day, hour, minute, second, micros) => {
            NaiveDate::from_ymd_opt(year.into(), month.into(), day.into())
                .and_then(|d| d.and_hms_micro_opt(hour.into(), minute.into(), second.into(), micros))
                .ok_or_else(|| {
                    DatastoreError::Decode(format!("column '{}': invalid DATETIME", column))
                })
        }
        Value::Bytes(bytes) => time::parse_timestamp(&String::from_utf8_lossy(&bytes)),
        other => Err(DatastoreError::Decode(format!(
            "column '{}': expected DATETIME, got {:?}",
            column, other
        ))),
    }
}

/// Decodes nullable TIME values from both the binary and the text protocol.
fn time_from_value(value: Value, column: &str) -> Result<Option<NaiveTime>> {
    match value {
        Value::NULL => Ok(None),
        Value::Time(false, 0, hour, minute, second, micros) => {
            NaiveTime::from_hms_micro_opt(hour.into(), minute.into(), second.into(), micros)
                .map(Some)
                .ok_or_else(|| DatastoreError::Decode(format!("column '{}': invalid TIME", column)))
        }
        Value::Bytes(bytes) => time::parse_time_of_day(&String::from_utf8_lossy(&bytes)).map(Some),
        other => Err(DatastoreError::Decode(format!(
            "column '{}': expected TIME of day, got {:?}",
            column, other
        ))),
    }
}

fn airport_from_row(mut row: Row) -> Result<Airport> {
    Ok(Airport {
        id: take(&mut row, "id")?,
        iata: take(&mut row, "iata")?,
        name: take(&mut row, "name")?,
        city: take(&mut row, "city")?,
        country: take(&mut row, "country")?,
    })
}

fn amenity_from_row(mut row: Row) -> Result<Amenity> {
    let mut hours = [None; 14];
    for (slot, column) in hours.iter_mut().zip(WEEKLY_HOUR_COLUMNS) {
        *slot = time_from_value(take(&mut row, column)?, column)?;
    }
    let embedding: String = take(&mut row, "embedding")?;

    Ok(Amenity::from_parts(
        take(&mut row, "id")?,
        take(&mut row, "name")?,
        take(&mut row, "description")?,
        take(&mut row, "location")?,
        take(&mut row, "terminal")?,
        take(&mut row, "category")?,
        take(&mut row, "hour")?,
        hours,
        take(&mut row, "content")?,
        Embedding::parse(&embedding)?,
    ))
}

fn flight_from_row(mut row: Row) -> Result<Flight> {
    Ok(Flight {
        id: take(&mut row, "id")?,
        airline: take(&mut row, "airline")?,
        flight_number: take(&mut row, "flight_number")?,
        departure_airport: take(&mut row, "departure_airport")?,
        arrival_airport: take(&mut row, "arrival_airport")?,
        departure_time: datetime_from_value(take(&mut row, "departure_time")?, "departure_time")?,
        arrival_time: datetime_from_value(take(&mut row, "arrival_time")?, "arrival_time")?,
        departure_gate: take(&mut row, "departure_gate")?,
        arrival_gate: take(&mut row, "arrival_gate")?,
    })
}

fn ticket_from_row(mut row: Row) -> Result<Ticket> {
    Ok(Ticket {
        user_id: take(&mut row, "user_id")?,
        user_name: take(&mut row, "user_name")?,
        user_email: take(&mut row, "user_email")?,
        airline: take(&mut row, "airline")?,
        flight_number: take(&mut row, "flight_number")?,
        departure_airport: take(&mut row, "departure_airport")?,
        arrival_airport: take(&mut row, "arrival_airport")?,
        departure_time: datetime_from_value(take(&mut row, "departure_time")?, "departure_time")?,
        arrival_time: datetime_from_value(take(&mut row, "arrival_time")?, "arrival_time")?,
    })
}

fn policy_from_row(mut row: Row) -> Result<Policy> {
    let embedding: String = take(&mut row, "embedding")?;
    Ok(Policy {
        id: take(&mut row, "id")?,
        content: take(&mut row, "content")?,
        embedding: Embedding::parse(&embedding)?,
    })
}

// ----------------------------------------------------------------------------
// Async client
// ----------------------------------------------------------------------------

/// Async MySQL client: every call runs [`MysqlCore`] on a blocking worker.
///
/// Dropping a pending call does not cancel the statement; it finishes on
/// its worker and the result is discarded.
pub struct MysqlClient {
    core: Arc<MysqlCore>,
    workers: WorkerPool,
}

impl MysqlClient {
    /// Connects using the process-wide worker pool.
    pub async fn connect(config: MysqlConfig) -> Result<Self> {
        Self::connect_with(config, bridge::global().clone()).await
    }

    /// Connects using `workers` for every blocking call.
    pub async fn connect_with(config: MysqlConfig, workers: WorkerPool) -> Result<Self> {
        let core = workers.run(move || MysqlCore::connect(&config)).await?;
        Ok(Self {
            core: Arc::new(core),
            workers,
        })
    }

    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&MysqlCore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let core = self.core.clone();
        self.workers.run(move || f(&core)).await
    }
}

/// Registry constructor for [`Kind::CloudSqlMysql`].
pub fn create(config: DatastoreConfig) -> BoxFuture<'static, Result<Box<dyn Client>>> {
    Box::pin(async move {
        match config {
            DatastoreConfig::CloudSqlMysql(config) => {
                let client = MysqlClient::connect(config).await?;
                Ok(Box::new(client) as Box<dyn Client>)
            }
            other => Err(config_mismatch(Kind::CloudSqlMysql, &other)),
        }
    })
}

#[async_trait]
impl AirportStore for MysqlClient {
    async fn get_airport_by_id(&self, id: i64) -> Result<QueryOutput<Option<Airport>>> {
        self.call(move |core| core.get_airport_by_id(id))
            .await
            .map(QueryOutput::plain)
    }

    async fn get_airport_by_iata(&self, iata: &str) -> Result<QueryOutput<Option<Airport>>> {
        let iata = iata.to_string();
        self.call(move |core| core.get_airport_by_iata(&iata))
            .await
            .map(QueryOutput::plain)
    }

    async fn search_airports(
        &self,
        country: Option<&str>,
        city: Option<&str>,
        name: Option<&str>,
    ) -> Result<QueryOutput<Vec<Airport>>> {
        let country = country.map(str::to_string);
        let city = city.map(str::to_string);
        let name = name.map(str::to_string);
        self.call(move |core| {
            core.search_airports(country.as_deref(), city.as_deref(), name.as_deref())
        })
        .await
        .map(QueryOutput::plain)
    }
}

#[async_trait]
impl AmenityStore for MysqlClient {
    async fn get_amenity(&self, id: i64) -> Result<QueryOutput<Option<Amenity>>> {
        self.call(move |core| core.get_amenity(id))
            .await
            .map(QueryOutput::plain)
    }

    async fn amenities_search(
        &self,
        query: &Embedding,
        _similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<Amenity>>> {
        let query = query.clone();
        self.call(move |core| core.amenities_search(&query, top_k))
            .await
            .map(QueryOutput::plain)
    }
}

#[async_trait]
impl FlightStore for MysqlClient {
    async fn get_flight(&self, id: i64) -> Result<QueryOutput<Option<Flight>>> {
        self.call(move |core| core.get_flight(id))
            .await
            .map(QueryOutput::plain)
    }

    async fn search_flights_by_number(
        &self,
        airline: &str,
        number: &str,
    ) -> Result<QueryOutput<Vec<Flight>>> {
        let airline = airline.to_string();
        let number = number.to_string();
        self.call(move |core| core.search_flights_by_number(&airline, &number))
            .await
            .map(QueryOutput::plain)
    }

    async fn search_flights_by_airports(
        &self,
        date: NaiveDate,
        departure_airport: Option<&str>,
        arrival_airport: Option<&str>,
    ) -> Result<QueryOutput<Vec<Flight>>> {
        let departure = departure_airport.map(str::to_string);
        let arrival = arrival_airport.map(str::to_string);
        self.call(move |core| {
            core.search_flights_by_airports(date, departure.as_deref(), arrival.as_deref())
        })
        .await
        .map(QueryOutput::plain)
    }
}

#[async_trait]
impl TicketStore for MysqlClient {
    async fn validate_ticket(
        &self,
        airline: &str,
        flight_number: &str,
        departure_airport: &str,
        departure_time: NaiveDateTime,
    ) -> Result<QueryOutput<Option<Flight>>> {
        let airline = airline.to_string();
        let flight_number = flight_number.to_string();
        let departure_airport = departure_airport.to_string();
        self.call(move |core| {
            core.validate_ticket(&airline, &flight_number, &departure_airport, departure_time)
        })
        .await
        .map(QueryOutput::plain)
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        let ticket = ticket.clone();
        self.call(move |core| core.insert_ticket(&ticket)).await
    }

    async fn list_tickets(&self, user_id: &str) -> Result<QueryOutput<Vec<Ticket>>> {
        let user_id = user_id.to_string();
        self.call(move |core| core.list_tickets(&user_id))
            .await
            .map(QueryOutput::plain)
    }
}

#[async_trait]
impl PolicyStore for MysqlClient {
    async fn policies_search(
        &self,
        query: &Embedding,
        _similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<String>>> {
        let query = query.clone();
        self.call(move |core| core.policies_search(&query, top_k))
            .await
            .map(QueryOutput::plain)
    }
}

#[async_trait]
impl Client for MysqlClient {
    fn kind(&self) -> Kind {
        Kind::CloudSqlMysql
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

    async fn initialize_data(&self, dataset: &Dataset) -> Result<()> {
        let dataset = dataset.clone();
        self.call(move |core| core.initialize_data(&dataset)).await
    }

    async fn export_data(&self) -> Result<Dataset> {
        self.call(|core| core.export_data()).await
    }

    async fn close(&self) {
        let result = self
            .call(|core| {
                core.close();
                Ok(())
            })
            .await;
        if let Err(e) = result {
            error!(error = %e, "Failed to close MySQL client");
        }
    }
}
