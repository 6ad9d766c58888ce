//! Unbiased sample covariance.

use super::{CovarianceError, CovarianceEstimator, center, check_returns};
use ndarray::Array2;

/// Sample covariance with the `n - 1` denominator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleCovarianceEstimator;

impl SampleCovarianceEstimator {
    /// Create a new sample covariance estimator
    pub const fn new() -> Self {
        Self
    }
}

impl CovarianceEstimator for SampleCovarianceEstimator {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        check_returns(returns, 2)?;
        let centered = center(returns);
        let n = returns.nrows() as f64;
        Ok(centered.t().dot(&centered) / (n - 1.0))
    }

    fn name(&self) -> &'static str {
        "sample"
    }
}
