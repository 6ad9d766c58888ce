//! Objective values and gradients, all expressed as maximization problems.

use crate::config::Objective;
use ndarray::{Array1, Array2};

/// An objective restricted to a set of assets.
#[derive(Debug, Clone)]
pub struct ObjectiveFunction {
    objective: Objective,
    mean: Array1<f64>,
    covariance: Array2<f64>,
    risk_aversion: f64,
    risk_free_rate: f64,
}

impl ObjectiveFunction {
    /// Build the objective over `mean` and `covariance` (already restricted).
    ///
    /// `risk_free_rate` is per return period and only used by `MaxSharpe`.
    pub const fn new(
        objective: Objective,
        mean: Array1<f64>,
        covariance: Array2<f64>,
        risk_aversion: f64,
        risk_free_rate: f64,
    ) -> Self {
        Self {
            objective,
            mean,
            covariance,
            risk_aversion,
            risk_free_rate,
        }
    }

    /// Number of assets.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Value to maximize at `w`.
    pub fn value(&self, w: &Array1<f64>) -> f64 {
        let variance = w.dot(&self.covariance.dot(w));
        match self.objective {
            Objective::MinRisk => -variance,
            Objective::Utility => self.mean.dot(w) - 0.5 * self.risk_aversion * variance,
            Objective::MaxSharpe => {
                let sigma = variance.max(f64::MIN_POSITIVE).sqrt();
                (self.mean.dot(w) - self.risk_free_rate) / sigma
            }
        }
    }

    /// Gradient of [`value`](Self::value) at `w`.
    pub fn gradient(&self, w: &Array1<f64>) -> Array1<f64> {
        let sigma_w = self.covariance.dot(w);
        match self.objective {
            Objective::MinRisk => sigma_w * -2.0,
            Objective::Utility => &self.mean - &(sigma_w * self.risk_aversion),
            Objective::MaxSharpe => {
                let variance = w.dot(&sigma_w).max(f64::MIN_POSITIVE);
                let sigma = variance.sqrt();
                let excess = self.mean.dot(w) - self.risk_free_rate;
                &self.mean / sigma - &(sigma_w * (excess / (variance * sigma)))
            }
        }
    }

    /// Initial step size: inverse of a Gershgorin bound on the covariance.
    pub fn initial_step(&self) -> f64 {
        let bound = self
            .covariance
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
            .fold(0.0, f64::max);
        if bound > 0.0 { 1.0 / bound } else { 1.0 }
    }
}
