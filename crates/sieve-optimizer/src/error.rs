//! Optimizer error types.

use crate::constraints::Infeasibility;
use sieve_data::DataError;
use thiserror::Error;

/// Errors raised by the portfolio optimizer.
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// No weight vector satisfies every constraint.
    #[error("Infeasible optimization: {0}")]
    Infeasible(Infeasibility),

    /// Mean vector, covariance and tickers disagree in size.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Inputs contain NaN or infinite values.
    #[error("Non-finite input: {0}")]
    NonFinite(String),

    /// Invalid solver setting.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Building the weight vector failed.
    #[error(transparent)]
    Data(#[from] DataError),
}

impl From<Infeasibility> for OptimizerError {
    fn from(reason: Infeasibility) -> Self {
        Self::Infeasible(reason)
    }
}

/// Result alias for optimizer operations.
pub type Result<T> = std::result::Result<T, OptimizerError>;
