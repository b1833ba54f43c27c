//! The bulk-load unit: every family that `initialize_data` replaces.

use serde::{Deserialize, Serialize};

use super::{Airport, Amenity, Flight, Policy};

/// All records of the bulk-loaded families.
///
/// Tickets are not part of a dataset: they are created one at a time after
/// initialization and are wiped by the next full initialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub airports: Vec<Airport>,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
    #[serde(default)]
    pub flights: Vec<Flight>,
    #[serde(default)]
    pub policies: Vec<Policy>,
}

impl Dataset {
    /// Sorts every family by ascending id, the order `export_data` returns.
    pub fn sort_by_id(&mut self) {
        self.airports.sort_by_key(|a| a.id);
        self.amenities.sort_by_key(|a| a.id);
        self.flights.sort_by_key(|f| f.id);
        self.policies.sort_by_key(|p| p.id);
    }

    /// Total number of records across families.
    pub fn len(&self) -> usize {
        self.airports.len() + self.amenities.len() + self.flights.len() + self.policies.len()
    }

    /// Returns true if no family holds any record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
