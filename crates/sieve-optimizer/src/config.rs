//! Optimizer configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Optimization objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Objective {
    /// Maximize `(expected_return - risk_free_rate) / volatility`
    #[default]
    MaxSharpe,
    /// Minimize portfolio variance; risk aversion is ignored
    MinRisk,
    /// Maximize `expected_return - risk_aversion / 2 * variance`
    Utility,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MaxSharpe => "max-sharpe",
            Self::MinRisk => "min-risk",
            Self::Utility => "utility",
        };
        f.write_str(name)
    }
}

impl FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "max-sharpe" | "sharpe" => Ok(Self::MaxSharpe),
            "min-risk" | "minrisk" | "min-variance" => Ok(Self::MinRisk),
            "utility" | "mean-variance" => Ok(Self::Utility),
            other => Err(format!("unknown objective: {other}")),
        }
    }
}

/// Portfolio optimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Objective (default: MaxSharpe)
    pub objective: Objective,

    /// Risk aversion for the Utility objective (default: 2.0)
    pub risk_aversion: f64,

    /// Maximum weight of any held asset (default: 0.20)
    pub max_weight: f64,

    /// Maximum number of held assets (default: 15)
    pub max_holdings: usize,

    /// Minimum weight of any held asset (default: 0.01)
    pub weight_floor: f64,

    /// Annual risk-free rate (default: 0.02)
    pub risk_free_rate: f64,

    /// Return periods per year, converts the risk-free rate (default: 252)
    pub periods_per_year: f64,

    /// Gradient iterations per solve (default: 5000)
    pub max_iterations: usize,

    /// Convergence tolerance on the weight change (default: 1e-10)
    pub tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            objective: Objective::MaxSharpe,
            risk_aversion: 2.0,
            max_weight: 0.20,
            max_holdings: 15,
            weight_floor: 0.01,
            risk_free_rate: 0.02,
            periods_per_year: 252.0,
            max_iterations: 5000,
            tolerance: 1e-10,
        }
    }
}

impl OptimizerConfig {
    /// Risk-free rate per return period.
    pub fn periodic_risk_free_rate(&self) -> f64 {
        self.risk_free_rate / self.periods_per_year
    }
}
