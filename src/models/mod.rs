//! Domain records stored by every datastore backend.

mod airport;
mod amenity;
mod dataset;
mod embedding;
mod flight;
mod policy;
mod ticket;
pub mod time;

pub use airport::Airport;
pub use amenity::{Amenity, WEEKLY_HOUR_COLUMNS};
pub use dataset::Dataset;
pub use embedding::{Embedding, EMBEDDING_DIMENSIONS};
pub use flight::Flight;
pub use policy::Policy;
pub use ticket::Ticket;
