// Adapters layer: concrete implementations of the domain ports and data loading.

pub mod ingest;
pub mod memory;
pub mod snapshot;

pub use memory::{DishMatch, InMemoryStore, MenuRecord, NewRating};
pub use snapshot::Snapshot;
