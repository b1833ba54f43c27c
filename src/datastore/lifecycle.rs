//! Shared pieces of the bulk lifecycle: support checks and vector indexes.

use tracing::debug;

use super::{Capabilities, Capability, Kind};
use crate::error::{DatastoreError, Result};
use crate::models::{Dataset, EMBEDDING_DIMENSIONS};

/// A similarity index over the embeddings of one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorIndex {
    pub name: &'static str,
    pub family: Capability,
    /// Relational table holding the family.
    pub table: &'static str,
    /// Graph node label holding the family.
    pub label: &'static str,
    pub column: &'static str,
}

impl VectorIndex {
    pub const fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }
}

pub const AMENITIES_INDEX: VectorIndex = VectorIndex {
    name: "amenities_index",
    family: Capability::Amenities,
    table: "amenities",
    label: "Amenity",
    column: "embedding",
};

pub const POLICIES_INDEX: VectorIndex = VectorIndex {
    name: "policies_index",
    family: Capability::Policies,
    table: "policies",
    label: "Policy",
    column: "embedding",
};

/// Every similarity index, in build order.
pub const VECTOR_INDEXES: [VectorIndex; 2] = [AMENITIES_INDEX, POLICIES_INDEX];

/// Number of records `dataset` holds for a bulk family.
pub fn family_len(dataset: &Dataset, family: Capability) -> usize {
    match family {
        Capability::Airports => dataset.airports.len(),
        Capability::Amenities => dataset.amenities.len(),
        Capability::Flights => dataset.flights.len(),
        Capability::Policies => dataset.policies.len(),
        Capability::Tickets => 0,
    }
}

/// Fails if `dataset` holds records of a family the backend cannot persist.
///
/// Runs before anything is written, so a rejected dataset leaves the store
/// untouched. Empty families are always accepted.
pub fn ensure_supported(kind: Kind, capabilities: Capabilities, dataset: &Dataset) -> Result<()> {
    for family in Capability::bulk_families() {
        let count = family_len(dataset, *family);
        if count > 0 && !capabilities.contains(*family) {
            debug!(%kind, %family, count, "Rejecting dataset");
            return Err(DatastoreError::Unsupported {
                kind,
                capability: *family,
            });
        }
    }
    Ok(())
}

/// Fails unless the backend can read back every bulk family.
pub fn ensure_exportable(kind: Kind, capabilities: Capabilities) -> Result<()> {
    match Capability::bulk_families()
        .iter()
        .find(|family| !capabilities.contains(**family))
    {
        Some(family) => Err(DatastoreError::Unsupported {
            kind,
            capability: *family,
        }),
        None => Ok(()),
    }
}
