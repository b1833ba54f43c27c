//! CLI module for the retrieval datastore.
//!
//! Subcommands:
//! - `init`: Replace the configured datastore's contents with a dataset file
//! - `export`: Dump the datastore's contents as a dataset file
//! - `ping`: Connect, report the backend's capabilities and close
//! - `flights`: List a day's flights between airports
//! - `validate-ticket`: Look up the flight a ticket refers to

mod export;
mod flights;
mod init;
mod ping;

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;

use crate::config::{AppConfig, PROJECT_CONFIG_FILE};
use crate::datastore::Datastore;
use crate::models::time::{parse_date, parse_timestamp};

fn date_arg(text: &str) -> Result<NaiveDate, String> {
    parse_date(text).map_err(|e| e.to_string())
}

fn timestamp_arg(text: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(text).map_err(|e| e.to_string())
}

/// Retrieval datastore - airport data across interchangeable backends
#[derive(Parser)]
#[command(name = "retrieval-datastore")]
#[command(about = "Bulk-load, export and probe the airport retrieval datastore")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project configuration file
    #[arg(long, global = true, default_value = PROJECT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replace all stored data with the records of a dataset file
    Init {
        /// Dataset JSON file
        #[arg(long)]
        dataset: PathBuf,
    },

    /// Write all stored data to a dataset file
    Export {
        /// Output JSON file
        #[arg(long)]
        output: PathBuf,
    },

    /// Check connectivity and list supported capabilities
    Ping,

    /// List flights departing on a date, optionally filtered by airport
    Flights {
        /// Departure date (YYYY-MM-DD)
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,

        /// Departure airport code or name fragment
        #[arg(long)]
        from: Option<String>,

        /// Arrival airport code or name fragment
        #[arg(long)]
        to: Option<String>,
    },

    /// Find the flight matching a ticket's airline, number and departure
    ValidateTicket {
        #[arg(long)]
        airline: String,

        #[arg(long)]
        flight_number: String,

        #[arg(long)]
        departure_airport: String,

        /// Departure timestamp (e.g., "2024-01-01 08:00:00")
        #[arg(long, value_parser = timestamp_arg)]
        departure_time: NaiveDateTime,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::Init { ref dataset } => self.run_init(dataset).await,
            Command::Export { ref output } => self.run_export(output).await,
            Command::Ping => self.run_ping().await,
            Command::Flights {
                date,
                ref from,
                ref to,
            } => {
                self.run_flights(date, from.as_deref(), to.as_deref())
                    .await
            }
            Command::ValidateTicket {
                ref airline,
                ref flight_number,
                ref departure_airport,
                departure_time,
            } => {
                self.run_validate_ticket(airline, flight_number, departure_airport, departure_time)
                    .await
            }
        }
    }

    /// Loads the layered configuration and opens the configured backend.
    async fn open(&self) -> color_eyre::Result<Datastore> {
        let config = AppConfig::load_from(&self.config)
            .wrap_err_with(|| format!("Failed to load config ({})", self.config.display()))?;
        tracing::info!("Using {} datastore", config.datastore.kind());

        let datastore = Datastore::create(config.datastore)
            .await
            .wrap_err("Failed to open datastore")?;
        Ok(datastore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flights_parses_date() {
        let app = App::try_parse_from([
            "retrieval-datastore",
            "flights",
            "--date",
            "2024-01-01",
            "--from",
            "SFO",
        ])
        .unwrap();
        match app.command {
            Command::Flights { date, from, to } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
                assert_eq!(from.as_deref(), Some("SFO"));
                assert!(to.is_none());
            }
            _ => panic!("expected flights command"),
        }
    }

    #[test]
    fn test_flights_rejects_malformed_date() {
        let result = App::try_parse_from(["retrieval-datastore", "flights", "--date", "01/02/2024"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_ticket_parses_timestamp() {
        let app = App::try_parse_from([
            "retrieval-datastore",
            "--config",
            "custom.toml",
            "validate-ticket",
            "--airline",
            "UA",
            "--flight-number",
            "1532",
            "--departure-airport",
            "SFO",
            "--departure-time",
            "2024-01-01 08:30:00",
        ])
        .unwrap();
        assert_eq!(app.config, PathBuf::from("custom.toml"));
        match app.command {
            Command::ValidateTicket {
                airline,
                departure_time,
                ..
            } => {
                assert_eq!(airline, "UA");
                assert_eq!(
                    departure_time,
                    NaiveDate::from_ymd_opt(2024, 1, 1)
                        .unwrap()
                        .and_hms_opt(8, 30, 0)
                        .unwrap()
                );
            }
            _ => panic!("expected validate-ticket command"),
        }
    }
}
