//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading, caching or normalizing data.
#[derive(Debug, Error)]
pub enum DataError {
    /// A data source failed to produce a usable table.
    #[error("Data source {source_id} failed: {reason}")]
    Source {
        /// Identity of the failing source
        source_id: String,
        /// Why the source failed
        reason: String,
    },

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Returned status code
        status: u16,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Expected columns are absent from the table
    #[error("Schema error: missing required columns {missing:?}")]
    Schema {
        /// Names of the absent columns
        missing: Vec<String>,
    },

    /// A row has an empty ticker
    #[error("Empty ticker in row {row}")]
    EmptyTicker {
        /// Zero-based data row index
        row: usize,
    },

    /// The same ticker appears on more than one row
    #[error("Duplicate ticker: {0}")]
    DuplicateTicker(String),

    /// A requested ticker does not exist in the table
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    /// Too few tickers survived cleaning
    #[error("Insufficient universe: need at least {required} tickers, got {actual}")]
    InsufficientUniverse {
        /// Minimum number of tickers
        required: usize,
        /// Number of tickers remaining
        actual: usize,
    },

    /// Too few dated observations survived cleaning
    #[error("Insufficient history: need at least {required} dates, got {actual}")]
    InsufficientHistory {
        /// Minimum number of dates
        required: usize,
        /// Number of dates remaining
        actual: usize,
    },

    /// A price matrix or series violates its shape or ordering contract
    #[error("Invalid price data: {0}")]
    InvalidPrices(String),

    /// A weight vector is malformed
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(String),
}

impl DataError {
    /// Whether retrying the failed operation might succeed.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Io(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
