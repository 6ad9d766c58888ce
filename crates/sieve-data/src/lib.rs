#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sieve/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod clean;
pub mod error;
pub mod normalize;
pub mod prices;
pub mod schema;
pub mod source;
pub mod table;
pub mod weights;

pub use cache::{CachedDataset, DatasetCache, SqliteDatasetStore, StoredDataset, StoredSource};
pub use error::{DataError, Result};
pub use normalize::{NormalizeConfig, Normalizer};
pub use prices::{PriceMatrix, PriceSeries, SectorMap};
pub use schema::ColumnSchema;
pub use source::{CsvFileSource, CsvTextSource, DataSource, HttpCsvSource, RetryPolicy};
pub use table::{AbsentColumns, RawTable, RawUniverseRow, UniverseTable};
pub use weights::{Allocation, WeightVector};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
