//! Flight lookup command handlers.

use chrono::{NaiveDate, NaiveDateTime};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use super::App;
use crate::datastore::QueryOutput;

fn print_output<T: serde::Serialize>(output: &QueryOutput<T>) -> Result<()> {
    if let Some(sql) = &output.sql {
        tracing::debug!(%sql, "Executed statement");
    }
    println!("{}", serde_json::to_string_pretty(&output.data)?);
    Ok(())
}

impl App {
    /// Run the flights command: list one day's flights between airports.
    pub async fn run_flights(
        &self,
        date: NaiveDate,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<()> {
        let datastore = self.open().await?;
        let result = datastore.search_flights_by_airports(date, from, to).await;
        datastore.close().await;
        let output = result.wrap_err("Failed to search flights")?;

        tracing::info!("Found {} flights on {}", output.data.len(), date);
        print_output(&output)
    }

    /// Run the validate-ticket command: find the flight a ticket refers to.
    pub async fn run_validate_ticket(
        &self,
        airline: &str,
        flight_number: &str,
        departure_airport: &str,
        departure_time: NaiveDateTime,
    ) -> Result<()> {
        let datastore = self.open().await?;
        let result = datastore
            .validate_ticket(airline, flight_number, departure_airport, departure_time)
            .await;
        datastore.close().await;
        let output = result.wrap_err("Failed to validate ticket")?;

        if output.data.is_none() {
            tracing::warn!(
                "No flight {} {} departs {} at {}",
                airline,
                flight_number,
                departure_airport,
                departure_time
            );
        }
        print_output(&output)
    }
}
