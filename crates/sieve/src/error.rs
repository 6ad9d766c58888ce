//! Pipeline error type.

use sieve_data::DataError;
use sieve_optimizer::OptimizerError;
use sieve_output::{ExportError, ReportError};
use sieve_risk::{PerformanceError, RiskError};
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Any failure of a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No row passed the universe filter.
    #[error("Empty universe: no tickers match {filter}")]
    EmptyUniverse {
        /// Description of the active filter
        filter: String,
    },

    /// Loading, schema, or normalization failure.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Returns or covariance estimation failure.
    #[error(transparent)]
    Risk(#[from] RiskError),

    /// Optimization failure, including infeasible constraints.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Backtest failure.
    #[error(transparent)]
    Performance(#[from] PerformanceError),

    /// Export failure.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Report rendering failure.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parse error
    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}
