//! Ledoit-Wolf Shrinkage Covariance Estimator
//!
//! Implements the analytical shrinkage estimator from:
//! "A well-conditioned estimator for large-dimensional covariance matrices"
//! (Ledoit & Wolf, 2004)
//!
//! The estimator has the form:
//! Σ_LW = δ* μI + (1-δ*) S
//!
//! where:
//! - S is the (biased, 1/n) sample covariance matrix
//! - μ = trace(S)/p is the average variance
//! - δ* is the optimal shrinkage intensity (computed analytically)

use super::{CovarianceError, CovarianceEstimator, center, check_returns};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ledoit-Wolf covariance estimator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedoitWolfConfig {
    /// Minimum number of observations required (default: 2)
    pub min_observations: usize,

    /// Whether to center returns (subtract mean) before computing covariance
    pub center: bool,

    /// Use this intensity instead of the analytical one (must be in [0, 1])
    pub fixed_shrinkage: Option<f64>,
}

impl Default for LedoitWolfConfig {
    fn default() -> Self {
        Self {
            min_observations: 2,
            center: true,
            fixed_shrinkage: None,
        }
    }
}

/// Shrunk covariance together with the intensity that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShrunkCovariance {
    /// Shrunk covariance matrix
    pub covariance: Array2<f64>,
    /// Shrinkage intensity δ* in [0, 1]
    pub shrinkage: f64,
}

/// Ledoit-Wolf shrinkage covariance estimator
#[derive(Debug, Clone, Default)]
pub struct LedoitWolfEstimator {
    config: LedoitWolfConfig,
}

impl LedoitWolfEstimator {
    /// Create a new Ledoit-Wolf estimator with the given configuration
    pub const fn new(config: LedoitWolfConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub const fn config(&self) -> &LedoitWolfConfig {
        &self.config
    }

    fn prepare(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        check_returns(returns, self.config.min_observations.max(1))?;
        if let Some(s) = self.config.fixed_shrinkage
            && !(0.0..=1.0).contains(&s)
        {
            return Err(CovarianceError::InvalidParameter(format!(
                "fixed_shrinkage must be in [0, 1], got {s}"
            )));
        }
        Ok(if self.config.center {
            center(returns)
        } else {
            returns.clone()
        })
    }

    /// Optimal shrinkage intensity for already-prepared returns `x` (n x p).
    fn intensity(x: &Array2<f64>, sample_cov: &Array2<f64>, mu: f64) -> f64 {
        let (n_periods, n_assets) = x.dim();
        let n = n_periods as f64;
        let p = n_assets as f64;

        // β̄: average squared distance between each period's outer product and S
        let x2 = x.mapv(|v| v * v);
        let beta_sum = x2.t().dot(&x2).sum();
        let delta_sum = sample_cov.mapv(|v| v * v).sum();
        let beta = (beta_sum / n - delta_sum) / (p * n);

        // δ̄: squared distance between S and the target μI
        let trace = sample_cov.diag().sum();
        let delta = (delta_sum - 2.0 * mu * trace + p * mu * mu) / p;

        if delta <= 0.0 {
            // S already equals the target
            return 0.0;
        }
        (beta.min(delta) / delta).clamp(0.0, 1.0)
    }

    /// Estimate the shrunk covariance and report the intensity used.
    pub fn shrink(&self, returns: &Array2<f64>) -> Result<ShrunkCovariance, CovarianceError> {
        let x = self.prepare(returns)?;
        let (n_periods, n_assets) = x.dim();

        // Sample covariance: S = (1/n) * X^T * X
        let sample_cov = x.t().dot(&x) / n_periods as f64;
        let mu = sample_cov.diag().sum() / n_assets as f64;

        let shrinkage = self
            .config
            .fixed_shrinkage
            .unwrap_or_else(|| Self::intensity(&x, &sample_cov, mu));

        // Σ_LW = (1-δ*) S + δ* μI
        let mut covariance = sample_cov * (1.0 - shrinkage);
        covariance
            .diag_mut()
            .mapv_inplace(|v| v + shrinkage * mu);

        debug!(
            periods = n_periods,
            assets = n_assets,
            shrinkage,
            "Ledoit-Wolf shrinkage"
        );

        Ok(ShrunkCovariance {
            covariance,
            shrinkage,
        })
    }

    /// Shrinkage intensity only (useful for diagnostics)
    pub fn shrinkage_intensity(&self, returns: &Array2<f64>) -> Result<f64, CovarianceError> {
        Ok(self.shrink(returns)?.shrinkage)
    }
}

impl CovarianceEstimator for LedoitWolfEstimator {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        Ok(self.shrink(returns)?.covariance)
    }

    fn name(&self) -> &'static str {
        "ledoit-wolf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covariance::utils::condition_number;
    use approx::assert_relative_eq;
    use ndarray::{Axis, array};

    /// Average variance of the columns (1/n normalization).
    fn average_variance(returns: &Array2<f64>) -> f64 {
        let x = center(returns);
        let n = x.nrows() as f64;
        x.mapv(|v| v * v).sum_axis(Axis(0)).mean().unwrap() / n
    }

    fn fixture() -> Array2<f64> {
        array![
            [0.01, 0.02, -0.01],
            [-0.01, 0.01, 0.02],
            [0.02, -0.01, 0.01],
            [-0.02, 0.01, -0.01],
            [0.01, -0.02, 0.02],
            [0.02, 0.01, -0.02],
        ]
    }

    #[test]
    fn test_ledoit_wolf_config_default() {
        let config = LedoitWolfConfig::default();
        assert_eq!(config.min_observations, 2);
        assert!(config.center);
        assert!(config.fixed_shrinkage.is_none());
    }

    #[test]
    fn test_insufficient_data() {
        let estimator = LedoitWolfEstimator::default();
        let returns = Array2::<f64>::zeros((1, 3)); // Only 1 observation
        assert!(estimator.estimate(&returns).is_err());
    }

    #[test]
    fn test_matches_reference_values() {
        let shrunk = LedoitWolfEstimator::default().shrink(&fixture()).unwrap();

        assert_relative_eq!(shrunk.shrinkage, 0.892_128_874_388_255_7, epsilon = 1e-12);
        assert_relative_eq!(shrunk.covariance[[0, 0]], 2.208_697_737_296_840_3e-4, epsilon = 1e-15);
        assert_relative_eq!(shrunk.covariance[[0, 1]], -7.191_408_374_116_287e-6, epsilon = 1e-15);
        assert_relative_eq!(shrunk.covariance[[1, 2]], -1.498_210_077_940_892_7e-5, epsilon = 1e-15);
    }

    #[test]
    fn test_isotropic_sample_is_not_shrunk() {
        // S = 0.5 * I already equals the target
        let returns = array![[1.0, 0.0], [-1.0, 0.0], [0.0, 1.0], [0.0, -1.0]];
        let shrunk = LedoitWolfEstimator::default().shrink(&returns).unwrap();
        assert_eq!(shrunk.shrinkage, 0.0);
        assert_relative_eq!(shrunk.covariance[[0, 0]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(shrunk.covariance[[0, 1]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_trace_is_preserved() {
        let returns = fixture();
        let shrunk = LedoitWolfEstimator::default().shrink(&returns).unwrap();
        let trace: f64 = shrunk.covariance.diag().sum();
        assert_relative_eq!(trace, 3.0 * average_variance(&returns), epsilon = 1e-14);
    }

    #[test]
    fn test_fixed_shrinkage() {
        let config = LedoitWolfConfig {
            fixed_shrinkage: Some(1.0),
            ..Default::default()
        };
        let cov = LedoitWolfEstimator::new(config).estimate(&fixture()).unwrap();
        assert_relative_eq!(cov[[0, 1]], 0.0, epsilon = 1e-15);
        assert_relative_eq!(cov[[0, 0]], cov[[2, 2]], epsilon = 1e-15);

        let bad = LedoitWolfConfig {
            fixed_shrinkage: Some(1.5),
            ..Default::default()
        };
        assert!(matches!(
            LedoitWolfEstimator::new(bad).estimate(&fixture()),
            Err(CovarianceError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_more_assets_than_observations_is_well_conditioned() {
        // 3 observations, 10 assets: the sample covariance is singular
        let returns = Array2::from_shape_fn((3, 10), |(t, j)| ((t * 10 + j) as f64 * 0.7).sin() * 0.02);
        let estimator = LedoitWolfEstimator::default();
        let shrunk = estimator.shrink(&returns).unwrap();

        assert!(shrunk.shrinkage > 0.0);
        assert!(shrunk.shrinkage <= 1.0);
        assert!(condition_number(&shrunk.covariance).is_finite());

        for i in 0..10 {
            for j in 0..10 {
                assert_relative_eq!(
                    shrunk.covariance[[i, j]],
                    shrunk.covariance[[j, i]],
                    epsilon = 1e-15
                );
            }
        }
    }
}
