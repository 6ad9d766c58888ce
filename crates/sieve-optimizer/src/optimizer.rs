//! Constrained portfolio optimization.
//!
//! The solver is projected gradient ascent with a backtracking (Armijo) step
//! over the capped simplex. Cardinality is handled greedily: a relaxed
//! problem (no floor) is solved over every asset, the largest positions up to
//! the holdings limit are kept, and the problem is re-solved over the kept
//! assets with the floor in force.

use crate::config::{Objective, OptimizerConfig};
use crate::constraints::NormalizedConstraints;
use crate::error::{OptimizerError, Result};
use crate::objective::ObjectiveFunction;
use crate::projection::project_capped_simplex;
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;
use sieve_data::{Allocation, SectorMap, WeightVector};
use sieve_risk::RiskEstimate;
use tracing::{debug, info, warn};

/// Armijo sufficient-ascent constant.
const ARMIJO: f64 = 1e-4;

/// Step halvings tried before giving up on an iteration.
const MAX_BACKTRACKS: usize = 60;

/// Output of [`PortfolioOptimizer::optimize`].
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    /// Target weights of the held assets, in input ticker order
    pub weights: WeightVector,
    /// Objective that was optimized
    pub objective: Objective,
    /// Expected return per period, `mean' w`
    pub expected_return: f64,
    /// Volatility per period, `sqrt(w' cov w)`
    pub volatility: f64,
    /// Per-period Sharpe ratio against the configured risk-free rate
    pub sharpe: f64,
    /// Constraints the solution satisfies
    pub constraints: NormalizedConstraints,
    /// Gradient iterations over all solves
    pub iterations: usize,
    /// Whether every solve met the tolerance
    pub converged: bool,
}

impl OptimizationResult {
    /// Per-ticker allocations with sector and percentage contribution.
    pub fn allocations(&self, sectors: &SectorMap) -> Vec<Allocation> {
        self.weights.allocations(sectors)
    }

    /// Expected return scaled to a year.
    pub fn annualized_return(&self, periods_per_year: f64) -> f64 {
        self.expected_return * periods_per_year
    }

    /// Volatility scaled to a year.
    pub fn annualized_volatility(&self, periods_per_year: f64) -> f64 {
        self.volatility * periods_per_year.sqrt()
    }
}

/// Solver state after one projected-gradient run.
struct Solve {
    weights: Array1<f64>,
    iterations: usize,
    converged: bool,
}

/// Long-only mean-variance optimizer.
#[derive(Debug, Clone, Default)]
pub struct PortfolioOptimizer {
    config: OptimizerConfig,
}

impl PortfolioOptimizer {
    /// Create an optimizer with the given configuration
    pub const fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimize over the output of the risk estimator.
    pub fn optimize_estimate(&self, estimate: &RiskEstimate) -> Result<OptimizationResult> {
        self.optimize(estimate.tickers(), &estimate.mean, &estimate.covariance)
    }

    /// Optimize weights for `tickers` given their mean returns and covariance.
    ///
    /// # Errors
    ///
    /// - [`OptimizerError::Infeasible`] when the constraints admit no portfolio;
    ///   this is decided before solving
    /// - [`OptimizerError::DimensionMismatch`] / [`OptimizerError::NonFinite`] for bad inputs
    pub fn optimize(
        &self,
        tickers: &[String],
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> Result<OptimizationResult> {
        let n = tickers.len();
        self.validate_inputs(n, mean, covariance)?;
        let constraints = NormalizedConstraints::new(&self.config, n)?;
        let rf = self.config.periodic_risk_free_rate();

        debug!(
            objective = %self.config.objective,
            assets = n,
            max_active = constraints.max_active,
            min_holdings = constraints.min_holdings,
            "Optimizing portfolio"
        );

        // Relaxed solve: no floor, every asset eligible.
        let all: Vec<usize> = (0..n).collect();
        let relaxed = self.solve(&all, mean, covariance, 0.0, constraints.max_weight, rf);

        let threshold = (0.5 * constraints.floor).max(1e-8);
        let mut ranked = all;
        ranked.sort_by(|&a, &b| relaxed.weights[b].total_cmp(&relaxed.weights[a]));
        let significant = ranked
            .iter()
            .filter(|&&i| relaxed.weights[i] >= threshold)
            .count();
        let keep = significant.clamp(constraints.min_holdings, constraints.max_active);
        let mut active: Vec<usize> = ranked[..keep].to_vec();
        active.sort_unstable();

        if keep < n {
            debug!(
                dropped = n - keep,
                kept = keep,
                "Pruned assets for cardinality and floor"
            );
        }

        // Final solve with the floor on the kept assets.
        let final_solve = self.solve(
            &active,
            mean,
            covariance,
            constraints.floor,
            constraints.max_weight,
            rf,
        );

        let mut dense = Array1::<f64>::zeros(n);
        for (k, &i) in active.iter().enumerate() {
            dense[i] = final_solve.weights[k];
        }

        let expected_return = mean.dot(&dense);
        let volatility = dense.dot(&covariance.dot(&dense)).max(0.0).sqrt();
        let sharpe = if volatility > 0.0 {
            (expected_return - rf) / volatility
        } else {
            f64::NAN
        };
        let iterations = relaxed.iterations + final_solve.iterations;
        let converged = relaxed.converged && final_solve.converged;
        if !converged {
            warn!(
                iterations,
                "Optimizer stopped at the iteration limit; weights are feasible but may be suboptimal"
            );
        }

        let weights = WeightVector::from_dense(tickers, &dense.to_vec())?;

        info!(
            objective = %self.config.objective,
            holdings = weights.active_count(),
            expected_return,
            volatility,
            sharpe,
            iterations,
            "Optimized portfolio"
        );

        Ok(OptimizationResult {
            weights,
            objective: self.config.objective,
            expected_return,
            volatility,
            sharpe,
            constraints,
            iterations,
            converged,
        })
    }

    fn validate_inputs(
        &self,
        n: usize,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> Result<()> {
        if mean.len() != n || covariance.dim() != (n, n) {
            return Err(OptimizerError::DimensionMismatch(format!(
                "{n} tickers, mean of {}, covariance {:?}",
                mean.len(),
                covariance.dim()
            )));
        }
        if mean.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
            return Err(OptimizerError::NonFinite(
                "mean or covariance contains NaN or infinity".to_string(),
            ));
        }

        let c = &self.config;
        if !c.risk_aversion.is_finite() || c.risk_aversion < 0.0 {
            return Err(OptimizerError::InvalidConfig(format!(
                "risk_aversion must be finite and non-negative, got {}",
                c.risk_aversion
            )));
        }
        if !c.risk_free_rate.is_finite() {
            return Err(OptimizerError::InvalidConfig(
                "risk_free_rate must be finite".to_string(),
            ));
        }
        if c.periods_per_year.is_nan() || c.periods_per_year <= 0.0 {
            return Err(OptimizerError::InvalidConfig(
                "periods_per_year must be positive".to_string(),
            ));
        }
        if c.max_iterations == 0 || c.tolerance.is_nan() || c.tolerance <= 0.0 {
            return Err(OptimizerError::InvalidConfig(
                "max_iterations and tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Projected gradient ascent over `assets` with bounds `[lower, upper]`.
    fn solve(
        &self,
        assets: &[usize],
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        lower: f64,
        upper: f64,
        rf: f64,
    ) -> Solve {
        let f = ObjectiveFunction::new(
            self.config.objective,
            mean.select(Axis(0), assets),
            covariance.select(Axis(0), assets).select(Axis(1), assets),
            self.config.risk_aversion,
            rf,
        );

        let k = f.dim() as f64;
        let project = |v: &Array1<f64>| project_capped_simplex(v, lower, upper);

        let mut w = project(&Array1::from_elem(f.dim(), 1.0 / k));
        let mut value = f.value(&w);
        let mut step = f.initial_step();

        for iteration in 1..=self.config.max_iterations {
            let g = f.gradient(&w);

            let mut accepted = None;
            for _ in 0..MAX_BACKTRACKS {
                let candidate = project(&(&w + &(&g * step)));
                let candidate_value = f.value(&candidate);
                let ascent = g.dot(&(&candidate - &w));
                if candidate_value >= value + ARMIJO * ascent {
                    accepted = Some((candidate, candidate_value));
                    break;
                }
                step *= 0.5;
            }

            let Some((candidate, candidate_value)) = accepted else {
                return Solve {
                    weights: w,
                    iterations: iteration,
                    converged: true,
                };
            };

            let change = (&candidate - &w)
                .iter()
                .fold(0.0_f64, |m, d| m.max(d.abs()));
            w = candidate;
            value = candidate_value;

            if change <= self.config.tolerance {
                return Solve {
                    weights: w,
                    iterations: iteration,
                    converged: true,
                };
            }
            step *= 2.0;
        }

        Solve {
            weights: w,
            iterations: self.config.max_iterations,
            converged: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Infeasibility;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rstest::rstest;

    fn tickers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("T{i}")).collect()
    }

    fn unconstrained(objective: Objective) -> OptimizerConfig {
        OptimizerConfig {
            objective,
            max_weight: 1.0,
            max_holdings: 10,
            weight_floor: 0.0,
            risk_free_rate: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_min_risk_inverse_variance() {
        // Uncorrelated: weights proportional to 1 / variance
        let optimizer = PortfolioOptimizer::new(unconstrained(Objective::MinRisk));
        let result = optimizer
            .optimize(&tickers(2), &array![0.001, 0.002], &array![[1e-4, 0.0], [0.0, 4e-4]])
            .unwrap();

        assert_relative_eq!(result.weights.get("T0").unwrap(), 0.8, epsilon = 1e-6);
        assert_relative_eq!(result.weights.get("T1").unwrap(), 0.2, epsilon = 1e-6);
        assert!(result.converged);
    }

    #[test]
    fn test_max_sharpe_tangency() {
        // Uncorrelated, rf = 0: weights proportional to mean / variance
        let optimizer = PortfolioOptimizer::new(unconstrained(Objective::MaxSharpe));
        let result = optimizer
            .optimize(&tickers(2), &array![0.002, 0.001], &array![[1e-4, 0.0], [0.0, 4e-4]])
            .unwrap();

        // [20, 2.5] / 22.5
        assert_relative_eq!(result.weights.get("T0").unwrap(), 20.0 / 22.5, epsilon = 1e-5);
        assert_relative_eq!(result.weights.get("T1").unwrap(), 2.5 / 22.5, epsilon = 1e-5);
        assert_relative_eq!(
            result.sharpe,
            result.expected_return / result.volatility,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_utility_prefers_return_at_low_aversion() {
        let mean = array![0.004, 0.001];
        let cov = array![[4e-4, 0.0], [0.0, 1e-4]];

        let bold = PortfolioOptimizer::new(OptimizerConfig {
            risk_aversion: 0.5,
            ..unconstrained(Objective::Utility)
        })
        .optimize(&tickers(2), &mean, &cov)
        .unwrap();
        let timid = PortfolioOptimizer::new(OptimizerConfig {
            risk_aversion: 50.0,
            ..unconstrained(Objective::Utility)
        })
        .optimize(&tickers(2), &mean, &cov)
        .unwrap();

        assert!(bold.weights.get("T0").unwrap() > timid.weights.get("T0").unwrap());
    }

    #[test]
    fn test_cap_binds() {
        let optimizer = PortfolioOptimizer::new(OptimizerConfig {
            max_weight: 0.6,
            ..unconstrained(Objective::MinRisk)
        });
        let result = optimizer
            .optimize(&tickers(2), &array![0.0, 0.0], &array![[1e-4, 0.0], [0.0, 4e-4]])
            .unwrap();
        assert_relative_eq!(result.weights.get("T0").unwrap(), 0.6, epsilon = 1e-9);
        assert_relative_eq!(result.weights.get("T1").unwrap(), 0.4, epsilon = 1e-9);
    }

    #[test]
    fn test_cardinality_and_floor() {
        let n = 12;
        let mean = Array1::from_shape_fn(n, |i| 0.0005 + 0.0001 * i as f64);
        let cov = Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j { 2e-4 + 1e-5 * i as f64 } else { 3e-5 }
        });
        let config = OptimizerConfig {
            max_holdings: 5,
            max_weight: 0.3,
            weight_floor: 0.05,
            ..Default::default()
        };
        let result = PortfolioOptimizer::new(config)
            .optimize(&tickers(n), &mean, &cov)
            .unwrap();

        assert!(result.weights.active_count() <= 5);
        assert_relative_eq!(result.weights.total(), 1.0, epsilon = 1e-6);
        for (_, w) in result.weights.entries() {
            assert!(*w >= 0.05 - 1e-9 && *w <= 0.3 + 1e-9, "weight {w}");
        }
    }

    #[rstest]
    #[case(3, 0.2)]
    #[case(4, 0.24)]
    #[case(1, 0.5)]
    fn test_infeasible_before_solving(#[case] max_holdings: usize, #[case] max_weight: f64) {
        let config = OptimizerConfig {
            max_holdings,
            max_weight,
            ..Default::default()
        };
        let n = 8;
        let err = PortfolioOptimizer::new(config)
            .optimize(&tickers(n), &Array1::zeros(n), &Array2::eye(n))
            .unwrap_err();
        assert!(matches!(
            err,
            OptimizerError::Infeasible(Infeasibility::CapTooLow { .. })
        ));
    }

    #[test]
    fn test_bad_inputs() {
        let optimizer = PortfolioOptimizer::default();
        assert!(matches!(
            optimizer.optimize(&tickers(3), &Array1::zeros(2), &Array2::eye(3)),
            Err(OptimizerError::DimensionMismatch(_))
        ));
        assert!(matches!(
            optimizer.optimize(&tickers(2), &array![f64::NAN, 0.0], &Array2::eye(2)),
            Err(OptimizerError::NonFinite(_))
        ));
    }
}
