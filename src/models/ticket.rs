//! Tickets booked by users.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A booked ticket.
///
/// Tickets have no primary key; two tickets may be identical in every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub airline: String,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: NaiveDateTime,
    pub arrival_time: NaiveDateTime,
}
