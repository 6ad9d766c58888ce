//! Dataset normalization: raw universe rows into a dense price matrix.
//!
//! The pipeline is:
//! 1. keep only price columns whose label parses as a date (sorted, deduplicated)
//! 2. parse every cell, unparseable or non-positive prices become missing
//! 3. drop dates where every ticker is missing
//! 4. drop tickers whose missing fraction is not below the configured threshold
//! 5. drop any remaining date with a missing value (complete cases)
//!
//! Every drop is logged; nothing is imputed.

use crate::clean::parse_price;
use crate::error::{DataError, Result};
use crate::prices::{PriceMatrix, SectorMap};
use crate::table::UniverseTable;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Normalizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Tickers are kept only if their missing fraction is strictly below this
    /// value (default: 0.10)
    pub max_missing_fraction: f64,

    /// Minimum number of tickers that must survive (default: 2, the least an
    /// optimization needs; evaluating a given portfolio may lower it to 1)
    pub min_tickers: usize,

    /// Minimum number of dates that must survive (default: 2)
    pub min_dates: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_missing_fraction: 0.10,
            min_tickers: 2,
            min_dates: 2,
        }
    }
}

impl NormalizeConfig {
    fn validate(&self) -> Result<()> {
        let fraction = self.max_missing_fraction;
        if fraction.is_nan() || fraction <= 0.0 || fraction > 1.0 {
            return Err(DataError::InvalidConfig(format!(
                "max_missing_fraction must be in (0, 1], got {}",
                self.max_missing_fraction
            )));
        }
        if self.min_tickers == 0 {
            return Err(DataError::InvalidConfig(
                "min_tickers must be at least 1".to_string(),
            ));
        }
        if self.min_dates < 2 {
            return Err(DataError::InvalidConfig(
                "min_dates must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// Turns a universe table into a [`PriceMatrix`] and [`SectorMap`].
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    /// Create a normalizer with the given configuration
    pub const fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub const fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Normalize a universe table.
    ///
    /// # Errors
    ///
    /// - [`DataError::InsufficientUniverse`] when fewer than `min_tickers` survive
    /// - [`DataError::InsufficientHistory`] when fewer than `min_dates` survive
    /// - [`DataError::InvalidConfig`] for an out-of-range threshold
    pub fn normalize(&self, universe: &UniverseTable) -> Result<(PriceMatrix, SectorMap)> {
        self.config.validate()?;

        let date_columns = universe.date_columns();
        let discarded = universe.price_labels().len() - date_columns.len();
        if discarded > 0 {
            debug!(discarded, "Discarded price columns without a date label");
        }

        let rows = universe.rows();
        let n_tickers = rows.len();

        // Step 2: parse into a (dates x tickers) grid, NaN marks missing.
        let mut grid = Array2::<f64>::from_elem((date_columns.len(), n_tickers), f64::NAN);
        for (j, row) in rows.iter().enumerate() {
            for (i, &(_, label_idx)) in date_columns.iter().enumerate() {
                if let Some(p) = parse_price(&row.prices[label_idx]) {
                    grid[[i, j]] = p;
                }
            }
        }

        // Step 3: drop dates that are empty for every ticker.
        let populated: Vec<usize> = (0..date_columns.len())
            .filter(|&i| grid.row(i).iter().any(|v| !v.is_nan()))
            .collect();
        let grid = grid.select(Axis(0), &populated);
        let dates: Vec<_> = populated.iter().map(|&i| date_columns[i].0).collect();

        if dates.is_empty() {
            return Err(DataError::InsufficientHistory {
                required: self.config.min_dates,
                actual: 0,
            });
        }

        // Step 4: missing-fraction policy per ticker.
        let n_dates = dates.len() as f64;
        let kept: Vec<usize> = (0..n_tickers)
            .filter(|&j| {
                let missing = grid.column(j).iter().filter(|v| v.is_nan()).count();
                let fraction = missing as f64 / n_dates;
                let keep = fraction < self.config.max_missing_fraction;
                if !keep {
                    debug!(
                        ticker = %rows[j].ticker,
                        fraction,
                        "Dropped ticker over missing-data threshold"
                    );
                }
                keep
            })
            .collect();

        if kept.len() < self.config.min_tickers {
            return Err(DataError::InsufficientUniverse {
                required: self.config.min_tickers,
                actual: kept.len(),
            });
        }
        let grid = grid.select(Axis(1), &kept);

        // Step 5: complete cases only.
        let complete: Vec<usize> = (0..grid.nrows())
            .filter(|&i| grid.row(i).iter().all(|v| !v.is_nan()))
            .collect();
        if complete.len() < self.config.min_dates {
            return Err(DataError::InsufficientHistory {
                required: self.config.min_dates,
                actual: complete.len(),
            });
        }
        let grid = grid.select(Axis(0), &complete);
        let dates: Vec<_> = complete.iter().map(|&i| dates[i]).collect();

        let tickers: Vec<String> = kept.iter().map(|&j| rows[j].ticker.clone()).collect();
        let sectors: SectorMap = kept
            .iter()
            .map(|&j| (rows[j].ticker.clone(), rows[j].sector.clone()))
            .collect();

        info!(
            input_tickers = n_tickers,
            kept_tickers = tickers.len(),
            dates = dates.len(),
            "Normalized price matrix"
        );

        let prices = PriceMatrix::new(dates, tickers, grid)?;
        Ok((prices, sectors))
    }
}
