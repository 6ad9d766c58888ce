//! Sector, exchange and market-cap filtering of the universe table.

use crate::error::{PipelineError, Result};
use crate::universe::Universe;
use serde::{Deserialize, Serialize};
use sieve_data::{DataError, RawUniverseRow, UniverseTable};
use std::collections::BTreeSet;
use std::fmt;
use tracing::info;

/// Dollars per billion, the unit of [`UniverseFilter::min_market_cap_billions`].
pub const BILLION: f64 = 1e9;

/// Predicates on universe metadata, combined with logical AND.
///
/// Empty sector or exchange lists and an absent market-cap threshold impose
/// no restriction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseFilter {
    /// Sectors to keep
    pub sectors: Vec<String>,

    /// Exchanges to keep
    pub exchanges: Vec<String>,

    /// Minimum market capitalization in billions of dollars
    pub min_market_cap_billions: Option<f64>,
}

impl UniverseFilter {
    /// A filter that keeps every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given sectors.
    pub fn with_sectors<I, S>(mut self, sectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sectors = sectors.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict to the given exchanges.
    pub fn with_exchanges<I, S>(mut self, exchanges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exchanges = exchanges.into_iter().map(Into::into).collect();
        self
    }

    /// Require a market cap of at least `billions` billion dollars.
    pub const fn with_min_market_cap_billions(mut self, billions: f64) -> Self {
        self.min_market_cap_billions = Some(billions);
        self
    }

    /// The market-cap threshold in raw dollars, the unit of the source data.
    pub fn min_market_cap_usd(&self) -> Option<f64> {
        self.min_market_cap_billions.map(|b| b * BILLION)
    }

    /// Whether no predicate is active.
    pub fn is_unrestricted(&self) -> bool {
        self.sectors.is_empty()
            && self.exchanges.is_empty()
            && self.min_market_cap_billions.is_none()
    }

    /// Whether a row passes every active predicate.
    ///
    /// A row without an exchange or market cap fails the corresponding active
    /// predicate.
    pub fn matches(&self, row: &RawUniverseRow) -> bool {
        let sector_ok =
            self.sectors.is_empty() || self.sectors.iter().any(|s| s.trim() == row.sector);
        let exchange_ok = self.exchanges.is_empty()
            || row
                .exchange
                .as_deref()
                .is_some_and(|e| self.exchanges.iter().any(|x| x.trim() == e));
        let cap_ok = self
            .min_market_cap_usd()
            .is_none_or(|threshold| row.market_cap.is_some_and(|cap| cap >= threshold));
        sector_ok && exchange_ok && cap_ok
    }

    fn validate(&self) -> Result<()> {
        if let Some(b) = self.min_market_cap_billions
            && (!b.is_finite() || b < 0.0)
        {
            return Err(PipelineError::Config(format!(
                "min_market_cap_billions must be finite and non-negative, got {b}"
            )));
        }
        Ok(())
    }

    /// Metadata columns an active predicate needs but the table lacks.
    fn missing_columns(&self, universe: &UniverseTable) -> Vec<String> {
        let absent = universe.absent_columns();
        let mut missing = Vec::new();
        if !self.exchanges.is_empty()
            && let Some(name) = &absent.exchange
        {
            missing.push(name.clone());
        }
        if self.min_market_cap_billions.is_some()
            && let Some(name) = &absent.market_cap
        {
            missing.push(name.clone());
        }
        missing
    }

    /// Keep the rows that pass every active predicate.
    ///
    /// # Errors
    ///
    /// - [`DataError::Schema`] when an active predicate needs an exchange or
    ///   market-cap column the table lacks
    /// - [`PipelineError::EmptyUniverse`] when no row passes
    /// - [`PipelineError::Config`] for a negative or non-finite threshold
    pub fn apply(&self, universe: &UniverseTable) -> Result<UniverseTable> {
        self.validate()?;
        let missing = self.missing_columns(universe);
        if !missing.is_empty() {
            return Err(DataError::Schema { missing }.into());
        }
        let filtered = universe.retain_rows(|row| self.matches(row));

        info!(
            input = universe.size(),
            kept = filtered.size(),
            filter = %self,
            "Filtered universe"
        );

        if filtered.is_empty() {
            return Err(PipelineError::EmptyUniverse {
                filter: self.to_string(),
            });
        }
        Ok(filtered)
    }
}

impl fmt::Display for UniverseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unrestricted() {
            return f.write_str("no filter");
        }
        let mut parts = Vec::new();
        if !self.sectors.is_empty() {
            parts.push(format!("sector in [{}]", self.sectors.join(", ")));
        }
        if !self.exchanges.is_empty() {
            parts.push(format!("exchange in [{}]", self.exchanges.join(", ")));
        }
        if let Some(b) = self.min_market_cap_billions {
            parts.push(format!("market cap >= ${b}B"));
        }
        f.write_str(&parts.join(" and "))
    }
}

/// Distinct sectors present in the table.
pub fn available_sectors(universe: &UniverseTable) -> BTreeSet<String> {
    universe.rows().iter().map(|r| r.sector.clone()).collect()
}

/// Distinct exchanges present in the table.
pub fn available_exchanges(universe: &UniverseTable) -> BTreeSet<String> {
    universe
        .rows()
        .iter()
        .filter_map(|r| r.exchange.clone())
        .collect()
}
