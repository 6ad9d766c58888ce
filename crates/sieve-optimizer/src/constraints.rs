//! Constraint normalization and feasibility checks.
//!
//! The feasible region is `{ w : sum(w) = 1, floor <= w_i <= max_weight for
//! held assets, #held <= max_holdings }`. Requests are normalized against the
//! number of available tickers and validated before any solving happens.

use crate::config::OptimizerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

const EPS: f64 = 1e-12;

/// Why a constraint set admits no portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Infeasibility {
    /// There are no assets to allocate to.
    NoAssets,
    /// `max_holdings` is zero.
    NoHoldings,
    /// The weight floor is negative or not finite.
    InvalidFloor(f64),
    /// The per-asset cap is not positive or not finite.
    InvalidCap(f64),
    /// The floor exceeds the per-asset cap.
    FloorAboveCap {
        /// Weight floor
        floor: f64,
        /// Per-asset cap
        max_weight: f64,
    },
    /// Even fully invested at the cap, the holdings cannot reach 100%.
    CapTooLow {
        /// Holdings limit after normalization
        max_holdings: usize,
        /// Per-asset cap
        max_weight: f64,
    },
    /// The fewest holdings the cap allows already exceed 100% at the floor.
    FloorTooHigh {
        /// Weight floor
        floor: f64,
        /// Fewest holdings that can sum to one under the cap
        min_holdings: usize,
    },
}

impl fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAssets => write!(f, "no assets to allocate"),
            Self::NoHoldings => write!(f, "max_holdings must be at least 1"),
            Self::InvalidFloor(v) => write!(f, "weight floor {v} must be finite and non-negative"),
            Self::InvalidCap(v) => write!(f, "max weight {v} must be finite and positive"),
            Self::FloorAboveCap { floor, max_weight } => {
                write!(f, "weight floor {floor} exceeds max weight {max_weight}")
            }
            Self::CapTooLow {
                max_holdings,
                max_weight,
            } => write!(
                f,
                "{max_holdings} holdings x max weight {max_weight} = {:.4} < 1",
                *max_holdings as f64 * max_weight
            ),
            Self::FloorTooHigh {
                floor,
                min_holdings,
            } => write!(
                f,
                "{min_holdings} holdings x weight floor {floor} = {:.4} > 1",
                *min_holdings as f64 * floor
            ),
        }
    }
}

/// Validated constraints for a universe of `n_assets` tickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedConstraints {
    /// Number of candidate assets
    pub n_assets: usize,
    /// Holdings limit as requested
    pub requested_holdings: usize,
    /// `min(requested_holdings, n_assets)`
    pub max_holdings: usize,
    /// Largest holding count the weight floor allows, capped by `max_holdings`
    pub max_active: usize,
    /// Fewest holdings that can sum to one under `max_weight`
    pub min_holdings: usize,
    /// Per-asset cap
    pub max_weight: f64,
    /// Minimum weight of a held asset
    pub floor: f64,
}

impl NormalizedConstraints {
    /// Normalize and validate the constraint part of `config`.
    pub fn new(config: &OptimizerConfig, n_assets: usize) -> Result<Self, Infeasibility> {
        let floor = config.weight_floor;
        let max_weight = config.max_weight;

        if n_assets == 0 {
            return Err(Infeasibility::NoAssets);
        }
        if config.max_holdings == 0 {
            return Err(Infeasibility::NoHoldings);
        }
        if !floor.is_finite() || floor < 0.0 {
            return Err(Infeasibility::InvalidFloor(floor));
        }
        if !max_weight.is_finite() || max_weight <= 0.0 {
            return Err(Infeasibility::InvalidCap(max_weight));
        }
        if floor > max_weight {
            return Err(Infeasibility::FloorAboveCap { floor, max_weight });
        }

        let max_holdings = config.max_holdings.min(n_assets);
        if max_holdings < config.max_holdings {
            info!(
                requested = config.max_holdings,
                available = n_assets,
                "Clamped max_holdings to the available tickers"
            );
        }

        if (max_holdings as f64) * max_weight < 1.0 - EPS {
            return Err(Infeasibility::CapTooLow {
                max_holdings,
                max_weight,
            });
        }

        let min_holdings = ((1.0 / max_weight) - 1e-9).ceil().max(1.0) as usize;
        if (min_holdings as f64) * floor > 1.0 + EPS {
            return Err(Infeasibility::FloorTooHigh {
                floor,
                min_holdings,
            });
        }

        let floor_limit = if floor > 0.0 {
            ((1.0 / floor) + 1e-9).floor() as usize
        } else {
            n_assets
        };
        let max_active = max_holdings.min(floor_limit).max(min_holdings);

        Ok(Self {
            n_assets,
            requested_holdings: config.max_holdings,
            max_holdings,
            max_active,
            min_holdings,
            max_weight,
            floor,
        })
    }

    /// Whether `weights` satisfies every constraint within `tolerance`.
    pub fn admits(&self, weights: &[f64], tolerance: f64) -> bool {
        let sum: f64 = weights.iter().sum();
        let held: Vec<f64> = weights.iter().copied().filter(|w| *w != 0.0).collect();
        (sum - 1.0).abs() <= tolerance
            && held.len() <= self.max_holdings
            && held
                .iter()
                .all(|w| *w >= self.floor - tolerance && *w <= self.max_weight + tolerance)
    }
}
