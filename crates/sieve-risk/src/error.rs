//! Error types for returns and risk estimation.

use crate::covariance::CovarianceError;
use thiserror::Error;

/// Errors raised while deriving returns or estimating risk.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Not enough price observations to form returns.
    #[error("Insufficient history: need at least {required} observations, got {actual}")]
    InsufficientHistory {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Matrix shape does not match its labels.
    #[error("Shape mismatch: {0}")]
    Shape(String),

    /// A non-finite value was produced or supplied.
    #[error("Non-finite value: {0}")]
    NonFinite(String),

    /// Covariance estimation failed.
    #[error(transparent)]
    Covariance(#[from] CovarianceError),
}

/// Result alias for risk operations.
pub type Result<T> = std::result::Result<T, RiskError>;
