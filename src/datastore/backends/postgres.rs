//! AlloyDB for PostgreSQL backend.
//!
//! Uses `deadpool-postgres` for pooling and the `pgvector` extension for
//! similarity search (`ORDER BY embedding <=> $1`). Every lookup returns the
//! SQL it executed as the [`QueryOutput`] diagnostic.

use std::error::Error;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use chrono::{NaiveDate, NaiveDateTime};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, PoolError, RecyclingMethod};
use futures::future::BoxFuture;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info};

use super::{config_mismatch, contains_pattern, limit_param};
use crate::config::{DatastoreConfig, PostgresConfig};
use crate::datastore::{
    AirportStore, AmenityStore, Client, FlightStore, Kind, PolicyStore, QueryOutput, TicketStore,
    SEARCH_LIMIT,
};
use crate::error::{DatastoreError, Result};
use crate::models::time::day_window;
use crate::models::{Airport, Amenity, Dataset, Embedding, Flight, Policy, Ticket};

// ----------------------------------------------------------------------------
// pgvector wrapper for parameter binding
// ----------------------------------------------------------------------------

/// Wrapper for pgvector `vector` values.
///
/// # Binary Format
///
/// - 2 bytes: dimension count (big-endian `u16`)
/// - 2 bytes: unused, always zero
/// - 4 bytes per component: big-endian `f32`
///
/// The OID of `vector` differs per database, so the type is matched by name.
#[derive(Debug, Clone, PartialEq)]
struct PgVector(Vec<f32>);

impl From<&Embedding> for PgVector {
    fn from(embedding: &Embedding) -> Self {
        Self(embedding.as_slice().to_vec())
    }
}

impl PgVector {
    fn into_embedding(self) -> Result<Embedding> {
        Embedding::new(self.0)
    }
}

impl ToSql for PgVector {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        let dim = u16::try_from(self.0.len())?;
        out.reserve(4 + self.0.len() * 4);
        out.put_u16(dim);
        out.put_u16(0);
        for value in &self.0 {
            out.put_f32(*value);
        }
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        ty.name() == "vector"
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for PgVector {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() < 4 {
            return Err("vector header truncated".into());
        }
        let dim = u16::from_be_bytes([raw[0], raw[1]]) as usize;
        let body = &raw[4..];
        if body.len() != dim * 4 {
            return Err(format!(
                "vector of {} dimensions has {} payload bytes",
                dim,
                body.len()
            )
            .into());
        }
        Ok(PgVector(
            body.chunks_exact(4)
                .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ))
    }

    fn accepts(ty: &Type) -> bool {
        ty.name() == "vector"
    }
}

// ----------------------------------------------------------------------------
// Statements
// ----------------------------------------------------------------------------

const SCHEMA: &str = "
    CREATE EXTENSION IF NOT EXISTS vector;

    DROP TABLE IF EXISTS airports, amenities, flights, tickets, policies CASCADE;

    CREATE TABLE airports(
      id BIGINT PRIMARY KEY,
      iata TEXT,
      name TEXT,
      city TEXT,
      country TEXT
    );

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
      embedding vector(768) NOT NULL
    );

    CREATE TABLE flights(
      id BIGINT PRIMARY KEY,
      airline TEXT,
      flight_number TEXT,
      departure_airport TEXT,
      arrival_airport TEXT,
      departure_time TIMESTAMP,
      arrival_time TIMESTAMP,
      departure_gate TEXT,
      arrival_gate TEXT
    );

    CREATE TABLE tickets(
      user_id TEXT,
      user_name TEXT,
      user_email TEXT,
      airline TEXT,
      flight_number TEXT,
      departure_airport TEXT,
      arrival_airport TEXT,
      departure_time TIMESTAMP,
      arrival_time TIMESTAMP
    );

    CREATE TABLE policies(
      id BIGINT PRIMARY KEY,
      content TEXT NOT NULL,
      embedding vector(768) NOT NULL
    );
";

const CREATE_VECTOR_INDEXES: &str = "
    CREATE INDEX amenities_index ON amenities USING hnsw (embedding vector_cosine_ops);
    CREATE INDEX policies_index ON policies USING hnsw (embedding vector_cosine_ops);
";

const AIRPORT_COLUMNS: &str = "id, iata, name, city, country";

const AMENITY_COLUMNS: &str = "id, name, description, location, terminal, category, hour, \
     sunday_start_hour, sunday_end_hour, monday_start_hour, monday_end_hour, \
     tuesday_start_hour, tuesday_end_hour, wednesday_start_hour, wednesday_end_hour, \
     thursday_start_hour, thursday_end_hour, friday_start_hour, friday_end_hour, \
     saturday_start_hour, saturday_end_hour, content, embedding";

const FLIGHT_COLUMNS: &str = "id, airline, flight_number, departure_airport, arrival_airport, \
     departure_time, arrival_time, departure_gate, arrival_gate";

const GET_AIRPORT_BY_ID: &str = "SELECT id, iata, name, city, country FROM airports WHERE id = $1";

const GET_AIRPORT_BY_IATA: &str = "SELECT id, iata, name, city, country FROM airports \
     WHERE LOWER(iata) = LOWER($1) ORDER BY id LIMIT 1";

const SEARCH_AIRPORTS: &str = "SELECT id, iata, name, city, country FROM airports \
     WHERE ($1::text IS NULL OR country ILIKE $1) \
       AND ($2::text IS NULL OR city ILIKE $2) \
       AND ($3::text IS NULL OR name ILIKE $3) \
     ORDER BY id LIMIT $4";

const GET_FLIGHT: &str = "SELECT id, airline, flight_number, departure_airport, arrival_airport, \
     departure_time, arrival_time, departure_gate, arrival_gate FROM flights WHERE id = $1";

const SEARCH_FLIGHTS_BY_NUMBER: &str = "SELECT id, airline, flight_number, departure_airport, \
     arrival_airport, departure_time, arrival_time, departure_gate, arrival_gate FROM flights \
     WHERE airline = $1 AND flight_number = $2 ORDER BY id LIMIT $3";

const SEARCH_FLIGHTS_BY_AIRPORTS: &str = "SELECT id, airline, flight_number, departure_airport, \
     arrival_airport, departure_time, arrival_time, departure_gate, arrival_gate FROM flights \
     WHERE ($1::text IS NULL OR departure_airport ILIKE $1) \
       AND ($2::text IS NULL OR arrival_airport ILIKE $2) \
       AND departure_time >= $3 AND departure_time < $4 \
     ORDER BY id LIMIT $5";

const VALIDATE_TICKET: &str = "SELECT id, airline, flight_number, departure_airport, \
     arrival_airport, departure_time, arrival_time, departure_gate, arrival_gate FROM flights \
     WHERE LOWER(airline) = LOWER($1) \
       AND LOWER(flight_number) = LOWER($2) \
       AND LOWER(departure_airport) = LOWER($3) \
       AND departure_time = $4 \
     ORDER BY id LIMIT 1";

const INSERT_AIRPORT: &str = "INSERT INTO airports (id, iata, name, city, country) \
     VALUES ($1, $2, $3, $4, $5)";

const INSERT_AMENITY: &str = "INSERT INTO amenities VALUES ($1, $2, $3, $4, $5, $6, $7, \
     $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23)";

const INSERT_FLIGHT: &str = "INSERT INTO flights VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)";

const INSERT_TICKET: &str = "INSERT INTO tickets (user_id, user_name, user_email, airline, \
     flight_number, departure_airport, arrival_airport, departure_time, arrival_time) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)";

const LIST_TICKETS: &str = "SELECT user_id, user_name, user_email, airline, flight_number, \
     departure_airport, arrival_airport, departure_time, arrival_time FROM tickets \
     WHERE user_id = $1";

const INSERT_POLICY: &str = "INSERT INTO policies VALUES ($1, $2, $3)";

const SEARCH_POLICIES: &str = "SELECT content FROM policies ORDER BY embedding <=> $1 LIMIT $2";

fn amenity_query(filter: &str) -> String {
    format!("SELECT {} FROM amenities {}", AMENITY_COLUMNS, filter)
}

// ----------------------------------------------------------------------------
// Client
// ----------------------------------------------------------------------------

/// AlloyDB for PostgreSQL client.
///
/// This type is cheap to clone - the underlying connection pool is `Arc`-based.
#[derive(Clone)]
pub struct PostgresClient {
    pool: Pool,
}

impl PostgresClient {
    /// Creates the pool and waits for one connection to succeed.
    pub async fn connect(config: PostgresConfig) -> Result<Self> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .user(&config.user)
            .password(&config.password)
            .dbname(&config.database)
            .application_name(env!("CARGO_PKG_NAME"));

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(16)
            .build()
            .map_err(|e| DatastoreError::Pool(format!("Failed to create connection pool: {}", e)))?;

        let client = Self { pool };
        client.get_connection().await?.batch_execute("SELECT 1").await?;

        info!(
            instance = %config.instance_uri(),
            database = %config.database,
            "Connected to AlloyDB for PostgreSQL"
        );
        Ok(client)
    }

    async fn get_connection(&self) -> Result<Object> {
        self.pool.get().await.map_err(pool_error)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let conn = self.get_connection().await?;
        let stmt = conn.prepare_cached(sql).await.map_err(|e| query_error(e, sql))?;
        conn.query(&stmt, params)
            .await
            .map_err(|e| query_error(e, sql))
    }

    async fn query_opt(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Option<Row>> {
        let conn = self.get_connection().await?;
        let stmt = conn.prepare_cached(sql).await.map_err(|e| query_error(e, sql))?;
        conn.query_opt(&stmt, params)
            .await
            .map_err(|e| query_error(e, sql))
    }
}

/// Registry constructor for [`Kind::AlloyDbPostgres`].
pub fn create(config: DatastoreConfig) -> BoxFuture<'static, Result<Box<dyn Client>>> {
    Box::pin(async move {
        match config {
            DatastoreConfig::AlloyDbPostgres(config) => {
                let client = PostgresClient::connect(config).await?;
                Ok(Box::new(client) as Box<dyn Client>)
            }
            other => Err(config_mismatch(Kind::AlloyDbPostgres, &other)),
        }
    })
}

fn pool_error(err: PoolError) -> DatastoreError {
    match err {
        PoolError::Closed => DatastoreError::Closed,
        PoolError::Backend(e) => DatastoreError::Postgres(e),
        other => DatastoreError::Pool(format!("Failed to get connection from pool: {}", other)),
    }
}

/// Attaches the server's diagnostic and the failing statement.
fn query_error(err: tokio_postgres::Error, sql: &str) -> DatastoreError {
    let detail = err
        .as_db_error()
        .map(|db_err| {
            format!(
                "{}: {} ({})",
                db_err.severity(),
                db_err.message(),
                db_err.code().code()
            )
        })
        .unwrap_or_else(|| err.to_string());
    DatastoreError::Query {
        message: detail,
        query: sql.to_string(),
    }
}

// ----------------------------------------------------------------------------
// Row decoding
// ----------------------------------------------------------------------------

fn airport_from_row(row: &Row) -> Result<Airport> {
    Ok(Airport {
        id: row.try_get("id")?,
        iata: row.try_get("iata")?,
        name: row.try_get("name")?,
        city: row.try_get("city")?,
        country: row.try_get("country")?,
    })
}

fn amenity_from_row(row: &Row) -> Result<Amenity> {
    let mut hours = [None; 14];
    for (slot, column) in hours.iter_mut().zip(crate::models::WEEKLY_HOUR_COLUMNS) {
        *slot = row.try_get(column)?;
    }
    let embedding: PgVector = row.try_get("embedding")?;

    Ok(Amenity::from_parts(
        row.try_get("id")?,
        row.try_get("name")?,
        row.try_get("description")?,
        row.try_get("location")?,
        row.try_get("terminal")?,
        row.try_get("category")?,
        row.try_get("hour")?,
        hours,
        row.try_get("content")?,
        embedding.into_embedding()?,
    ))
}

fn flight_from_row(row: &Row) -> Result<Flight> {
    Ok(Flight {
        id: row.try_get("id")?,
        airline: row.try_get("airline")?,
        flight_number: row.try_get("flight_number")?,
        departure_airport: row.try_get("departure_airport")?,
        arrival_airport: row.try_get("arrival_airport")?,
        departure_time: row.try_get("departure_time")?,
        arrival_time: row.try_get("arrival_time")?,
        departure_gate: row.try_get("departure_gate")?,
        arrival_gate: row.try_get("arrival_gate")?,
    })
}

fn ticket_from_row(row: &Row) -> Result<Ticket> {
    Ok(Ticket {
        user_id: row.try_get("user_id")?,
        user_name: row.try_get("user_name")?,
        user_email: row.try_get("user_email")?,
        airline: row.try_get("airline")?,
        flight_number: row.try_get("flight_number")?,
        departure_airport: row.try_get("departure_airport")?,
        arrival_airport: row.try_get("arrival_airport")?,
        departure_time: row.try_get("departure_time")?,
        arrival_time: row.try_get("arrival_time")?,
    })
}

fn policy_from_row(row: &Row) -> Result<Policy> {
    let embedding: PgVector = row.try_get("embedding")?;
    Ok(Policy {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        embedding: embedding.into_embedding()?,
    })
}

fn decode_all<T>(rows: &[Row], decode: fn(&Row) -> Result<T>) -> Result<Vec<T>> {
    rows.iter().map(decode).collect()
}

// ----------------------------------------------------------------------------
// Contract
// ----------------------------------------------------------------------------

#[async_trait]
impl AirportStore for PostgresClient {
    async fn get_airport_by_id(&self, id: i64) -> Result<QueryOutput<Option<Airport>>> {
        let row = self.query_opt(GET_AIRPORT_BY_ID, &[&id]).await?;
        let airport = row.as_ref().map(airport_from_row).transpose()?;
        Ok(QueryOutput::with_sql(airport, GET_AIRPORT_BY_ID))
    }

    async fn get_airport_by_iata(&self, iata: &str) -> Result<QueryOutput<Option<Airport>>> {
        let row = self.query_opt(GET_AIRPORT_BY_IATA, &[&iata]).await?;
        let airport = row.as_ref().map(airport_from_row).transpose()?;
        Ok(QueryOutput::with_sql(airport, GET_AIRPORT_BY_IATA))
    }

    async fn search_airports(
        &self,
        country: Option<&str>,
        city: Option<&str>,
        name: Option<&str>,
    ) -> Result<QueryOutput<Vec<Airport>>> {
        let country = country.map(contains_pattern);
        let city = city.map(contains_pattern);
        let name = name.map(contains_pattern);
        let rows = self
            .query(SEARCH_AIRPORTS, &[&country, &city, &name, &SEARCH_LIMIT])
            .await?;
        Ok(QueryOutput::with_sql(
            decode_all(&rows, airport_from_row)?,
            SEARCH_AIRPORTS,
        ))
    }
}

#[async_trait]
impl AmenityStore for PostgresClient {
    async fn get_amenity(&self, id: i64) -> Result<QueryOutput<Option<Amenity>>> {
        let sql = amenity_query("WHERE id = $1");
        let row = self.query_opt(&sql, &[&id]).await?;
        let amenity = row.as_ref().map(amenity_from_row).transpose()?;
        Ok(QueryOutput::new(amenity, Some(sql)))
    }

    async fn amenities_search(
        &self,
        query: &Embedding,
        _similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<Amenity>>> {
        let sql = amenity_query("ORDER BY embedding <=> $1 LIMIT $2");
        let vector = PgVector::from(query);
        let limit = limit_param(top_k);
        let rows = self.query(&sql, &[&vector, &limit]).await?;
        Ok(QueryOutput::new(decode_all(&rows, amenity_from_row)?, Some(sql)))
    }
}

#[async_trait]
impl FlightStore for PostgresClient {
    async fn get_flight(&self, id: i64) -> Result<QueryOutput<Option<Flight>>> {
        let row = self.query_opt(GET_FLIGHT, &[&id]).await?;
        let flight = row.as_ref().map(flight_from_row).transpose()?;
        Ok(QueryOutput::with_sql(flight, GET_FLIGHT))
    }

    async fn search_flights_by_number(
        &self,
        airline: &str,
        number: &str,
    ) -> Result<QueryOutput<Vec<Flight>>> {
        let rows = self
            .query(SEARCH_FLIGHTS_BY_NUMBER, &[&airline, &number, &SEARCH_LIMIT])
            .await?;
        Ok(QueryOutput::with_sql(
            decode_all(&rows, flight_from_row)?,
            SEARCH_FLIGHTS_BY_NUMBER,
        ))
    }

    async fn search_flights_by_airports(
        &self,
        date: NaiveDate,
        departure_airport: Option<&str>,
        arrival_airport: Option<&str>,
    ) -> Result<QueryOutput<Vec<Flight>>> {
        let (start, end) = day_window(date);
        let departure = departure_airport.map(contains_pattern);
        let arrival = arrival_airport.map(contains_pattern);
        let rows = self
            .query(
                SEARCH_FLIGHTS_BY_AIRPORTS,
                &[&departure, &arrival, &start, &end, &SEARCH_LIMIT],
            )
            .await?;
        Ok(QueryOutput::with_sql(
            decode_all(&rows, flight_from_row)?,
            SEARCH_FLIGHTS_BY_AIRPORTS,
        ))
    }
}

#[async_trait]
impl TicketStore for PostgresClient {
    async fn validate_ticket(
        &self,
        airline: &str,
        flight_number: &str,
        departure_airport: &str,
        departure_time: NaiveDateTime,
    ) -> Result<QueryOutput<Option<Flight>>> {
        let row = self
            .query_opt(
                VALIDATE_TICKET,
                &[&airline, &flight_number, &departure_airport, &departure_time],
            )
            .await?;
        let flight = row.as_ref().map(flight_from_row).transpose()?;
        Ok(QueryOutput::with_sql(flight, VALIDATE_TICKET))
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.execute(
            INSERT_TICKET,
            &[
                &ticket.user_id,
                &ticket.user_name,
                &ticket.user_email,
                &ticket.airline,
                &ticket.flight_number,
                &ticket.departure_airport,
                &ticket.arrival_airport,
                &ticket.departure_time,
                &ticket.arrival_time,
            ],
        )
        .await
        .map_err(|e| query_error(e, INSERT_TICKET))?;
        Ok(())
    }

    async fn list_tickets(&self, user_id: &str) -> Result<QueryOutput<Vec<Ticket>>> {
        let rows = self.query(LIST_TICKETS, &[&user_id]).await?;
        Ok(QueryOutput::with_sql(
            decode_all(&rows, ticket_from_row)?,
            LIST_TICKETS,
        ))
    }
}

#[async_trait]
impl PolicyStore for PostgresClient {
    async fn policies_search(
        &self,
        query: &Embedding,
        _similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<String>>> {
        let vector = PgVector::from(query);
        let limit = limit_param(top_k);
        let rows = self.query(SEARCH_POLICIES, &[&vector, &limit]).await?;
        let contents = rows
            .iter()
            .map(|row| row.try_get::<_, String>("content"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(QueryOutput::with_sql(contents, SEARCH_POLICIES))
    }
}

#[async_trait]
impl Client for PostgresClient {
    fn kind(&self) -> Kind {
        Kind::AlloyDbPostgres
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

    /// Replaces every table in a single transaction.
    async fn initialize_data(&self, dataset: &Dataset) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let tx = conn.transaction().await?;

        tx.batch_execute(SCHEMA)
            .await
            .map_err(|e| query_error(e, SCHEMA))?;
        debug!("Recreated tables");

        let stmt = tx.prepare(INSERT_AIRPORT).await?;
        for a in &dataset.airports {
            tx.execute(&stmt, &[&a.id, &a.iata, &a.name, &a.city, &a.country])
                .await?;
        }
        debug!(count = dataset.airports.len(), "Inserted airports");

        let stmt = tx.prepare(INSERT_AMENITY).await?;
        for a in &dataset.amenities {
            let hours = a.weekly_hours();
            let embedding = PgVector::from(&a.embedding);
            let mut params: Vec<&(dyn ToSql + Sync)> = vec![
                &a.id,
                &a.name,
                &a.description,
                &a.location,
                &a.terminal,
                &a.category,
                &a.hour,
            ];
            params.extend(hours.iter().map(|h| h as &(dyn ToSql + Sync)));
            params.push(&a.content);
            params.push(&embedding);
            tx.execute(&stmt, &params).await?;
        }
        debug!(count = dataset.amenities.len(), "Inserted amenities");

        let stmt = tx.prepare(INSERT_FLIGHT).await?;
        for f in &dataset.flights {
            tx.execute(
                &stmt,
                &[
                    &f.id,
                    &f.airline,
                    &f.flight_number,
                    &f.departure_airport,
                    &f.arrival_airport,
                    &f.departure_time,
                    &f.arrival_time,
                    &f.departure_gate,
                    &f.arrival_gate,
                ],
            )
            .await?;
        }
        debug!(count = dataset.flights.len(), "Inserted flights");

        let stmt = tx.prepare(INSERT_POLICY).await?;
        for p in &dataset.policies {
            let embedding = PgVector::from(&p.embedding);
            tx.execute(&stmt, &[&p.id, &p.content, &embedding]).await?;
        }
        debug!(count = dataset.policies.len(), "Inserted policies");

        tx.batch_execute(CREATE_VECTOR_INDEXES)
            .await
            .map_err(|e| query_error(e, CREATE_VECTOR_INDEXES))?;
        info!("Created vector indexes");

        tx.commit().await?;
        Ok(())
    }

    async fn export_data(&self) -> Result<Dataset> {
        let airports = self
            .query(&format!("SELECT {} FROM airports ORDER BY id ASC", AIRPORT_COLUMNS), &[])
            .await?;
        let amenities = self.query(&amenity_query("ORDER BY id ASC"), &[]).await?;
        let flights = self
            .query(&format!("SELECT {} FROM flights ORDER BY id ASC", FLIGHT_COLUMNS), &[])
            .await?;
        let policies = self
            .query("SELECT id, content, embedding FROM policies ORDER BY id ASC", &[])
            .await?;

        Ok(Dataset {
            airports: decode_all(&airports, airport_from_row)?,
            amenities: decode_all(&amenities, amenity_from_row)?,
            flights: decode_all(&flights, flight_from_row)?,
            policies: decode_all(&policies, policy_from_row)?,
        })
    }

    async fn close(&self) {
        self.pool.close();
        info!("PostgreSQL pool closed");
    }
}
