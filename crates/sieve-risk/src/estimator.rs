//! Returns & risk estimation: price matrix in, returns, mean vector and
//! covariance out.

use crate::covariance::{
    CovarianceEstimator, LedoitWolfConfig, LedoitWolfEstimator, SampleCovarianceEstimator,
    condition_number, is_positive_definite,
};
use crate::error::Result;
use crate::returns::ReturnsMatrix;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use sieve_data::PriceMatrix;
use tracing::{info, warn};

/// Covariance estimator choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CovarianceMethod {
    /// Unbiased sample covariance
    Sample,
    /// Ledoit-Wolf shrinkage toward a scaled identity
    #[default]
    LedoitWolf,
}

/// Risk estimation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Covariance estimator (default: Ledoit-Wolf)
    pub method: CovarianceMethod,
    /// Ledoit-Wolf settings, used when `method` is `LedoitWolf`
    pub ledoit_wolf: LedoitWolfConfig,
}

/// Output of [`RiskEstimator::estimate`].
#[derive(Debug, Clone)]
pub struct RiskEstimate {
    /// Simple returns the estimates were computed from
    pub returns: ReturnsMatrix,
    /// Historical mean return per ticker
    pub mean: Array1<f64>,
    /// Covariance of returns (tickers x tickers)
    pub covariance: Array2<f64>,
    /// Shrinkage intensity, when a shrinkage estimator was used
    pub shrinkage: Option<f64>,
}

impl RiskEstimate {
    /// Ticker order shared by `mean` and `covariance`.
    pub fn tickers(&self) -> &[String] {
        self.returns.tickers()
    }

    /// Condition number of the covariance matrix.
    pub fn condition_number(&self) -> f64 {
        condition_number(&self.covariance)
    }
}

/// Computes returns, historical mean and covariance from prices.
#[derive(Debug, Clone, Default)]
pub struct RiskEstimator {
    config: RiskConfig,
}

impl RiskEstimator {
    /// Create an estimator with the given configuration
    pub const fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub const fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Estimate returns, mean vector and covariance.
    pub fn estimate(&self, prices: &PriceMatrix) -> Result<RiskEstimate> {
        let returns = ReturnsMatrix::from_prices(prices)?;
        let mean = returns.mean();

        let (covariance, shrinkage) = match self.config.method {
            CovarianceMethod::Sample => {
                let cov = SampleCovarianceEstimator::new().estimate(returns.values())?;
                (cov, None)
            }
            CovarianceMethod::LedoitWolf => {
                let shrunk =
                    LedoitWolfEstimator::new(self.config.ledoit_wolf.clone()).shrink(returns.values())?;
                (shrunk.covariance, Some(shrunk.shrinkage))
            }
        };

        if !is_positive_definite(&covariance) {
            warn!(
                periods = returns.n_periods(),
                assets = returns.n_assets(),
                method = ?self.config.method,
                "Covariance is not positive definite"
            );
        }

        info!(
            periods = returns.n_periods(),
            assets = returns.n_assets(),
            method = ?self.config.method,
            shrinkage = ?shrinkage,
            "Estimated returns and covariance"
        );

        Ok(RiskEstimate {
            returns,
            mean,
            covariance,
            shrinkage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn prices(n_dates: usize, n_assets: usize) -> PriceMatrix {
        let dates = (0..n_dates)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64))
            .collect();
        let tickers = (0..n_assets).map(|j| format!("T{j}")).collect();
        let values = Array2::from_shape_fn((n_dates, n_assets), |(t, j)| {
            100.0 * (1.0 + 0.01 * j as f64) + ((t * (j + 2)) as f64 * 0.9).sin() * 2.0
        });
        PriceMatrix::new(dates, tickers, values).unwrap()
    }

    #[rstest]
    #[case(CovarianceMethod::Sample, false)]
    #[case(CovarianceMethod::LedoitWolf, true)]
    fn test_estimate_shapes(#[case] method: CovarianceMethod, #[case] shrunk: bool) {
        let estimator = RiskEstimator::new(RiskConfig {
            method,
            ..Default::default()
        });
        let estimate = estimator.estimate(&prices(30, 4)).unwrap();

        assert_eq!(estimate.returns.n_periods(), 29);
        assert_eq!(estimate.mean.len(), 4);
        assert_eq!(estimate.covariance.dim(), (4, 4));
        assert_eq!(estimate.shrinkage.is_some(), shrunk);
        assert_eq!(estimate.tickers().len(), 4);
    }

    #[test]
    fn test_mean_is_historical() {
        let prices = prices(10, 3);
        let estimate = RiskEstimator::default().estimate(&prices).unwrap();
        let first = prices.column("T1").unwrap();
        let expected: f64 =
            (1..10).map(|t| first[t] / first[t - 1] - 1.0).sum::<f64>() / 9.0;
        assert_relative_eq!(estimate.mean[1], expected, epsilon = 1e-14);
    }

    #[test]
    fn test_shrinkage_improves_conditioning() {
        // Nearly as many assets as observations
        let prices = prices(9, 7);
        let sample = RiskEstimator::new(RiskConfig {
            method: CovarianceMethod::Sample,
            ..Default::default()
        })
        .estimate(&prices)
        .unwrap();
        let shrunk = RiskEstimator::default().estimate(&prices).unwrap();

        assert!(shrunk.condition_number() < sample.condition_number());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: RiskConfig = serde_json::from_str(r#"{"method":"sample"}"#).unwrap();
        assert_eq!(config.method, CovarianceMethod::Sample);
        assert_eq!(config.ledoit_wolf, LedoitWolfConfig::default());
    }
}
