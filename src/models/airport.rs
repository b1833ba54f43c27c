//! Airport records.

use serde::{Deserialize, Serialize};

/// An airport, keyed by a backend-assigned integer id.
///
/// Flights refer to airports by IATA code only; there is no foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    pub id: i64,
    /// Three-letter IATA code (e.g., "SFO").
    pub iata: String,
    pub name: String,
    pub city: String,
    pub country: String,
}
