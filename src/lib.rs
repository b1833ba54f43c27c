//! Retrieval datastore - capability-typed storage for airport retrieval data.
//!
//! One contract ([`datastore::Datastore`]) over interchangeable backends:
//! Cloud SQL for MySQL, AlloyDB for PostgreSQL and Neo4j.

pub mod cli;
pub mod config;
pub mod datastore;
pub mod error;
pub mod models;
