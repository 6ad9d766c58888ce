//! Covariance estimation for asset returns.
//!
//! The sample covariance is ill-conditioned when the number of tickers
//! approaches the number of observations; the Ledoit-Wolf estimator blends it
//! toward a scaled identity to keep the optimizer's inputs well-behaved.

pub mod ledoit_wolf;
pub mod sample;
pub mod utils;

pub use ledoit_wolf::{LedoitWolfConfig, LedoitWolfEstimator, ShrunkCovariance};
pub use sample::SampleCovarianceEstimator;
pub use utils::{condition_number, is_positive_definite, symmetric_eigenvalues};

use ndarray::{Array2, Axis};
use thiserror::Error;

/// Errors that can occur during covariance estimation
#[derive(Debug, Error)]
pub enum CovarianceError {
    /// Insufficient data for estimation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Returns contain NaN or infinite values
    #[error("Returns contain non-finite values")]
    NonFinite,

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Trait for covariance matrix estimators
pub trait CovarianceEstimator {
    /// Estimate the covariance matrix from asset returns
    ///
    /// # Arguments
    /// * `returns` - Matrix where each row is a period and each column is an asset
    ///
    /// # Returns
    /// * Estimated covariance matrix (N x N where N is number of assets)
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError>;

    /// Short estimator name used in logs.
    fn name(&self) -> &'static str;
}

/// Shared input checks: enough rows, at least one column, finite values.
pub(crate) fn check_returns(
    returns: &Array2<f64>,
    min_observations: usize,
) -> Result<(), CovarianceError> {
    let (n_periods, n_assets) = returns.dim();
    if n_periods < min_observations {
        return Err(CovarianceError::InsufficientData {
            required: min_observations,
            actual: n_periods,
        });
    }
    if n_assets == 0 {
        return Err(CovarianceError::DimensionMismatch {
            expected: 1,
            actual: 0,
        });
    }
    if returns.iter().any(|v| !v.is_finite()) {
        return Err(CovarianceError::NonFinite);
    }
    Ok(())
}

/// Subtract the column means.
pub(crate) fn center(returns: &Array2<f64>) -> Array2<f64> {
    match returns.mean_axis(Axis(0)) {
        Some(means) => returns - &means.insert_axis(Axis(0)),
        None => returns.clone(),
    }
}
