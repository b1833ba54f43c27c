//! Flight records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A scheduled flight.
///
/// `departure_airport` and `arrival_airport` hold IATA codes that loosely
/// match [`Airport::iata`](super::Airport); the match is never enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: i64,
    /// Airline code (e.g., "UA").
    pub airline: String,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: NaiveDateTime,
    pub arrival_time: NaiveDateTime,
    pub departure_gate: String,
    pub arrival_gate: String,
}
