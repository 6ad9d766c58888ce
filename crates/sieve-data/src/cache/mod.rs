//! Caching layer for loaded datasets.

pub mod memory;
pub mod sqlite;

pub use memory::{CachedDataset, DatasetCache};
pub use sqlite::{SqliteDatasetStore, StoredDataset, StoredSource};
