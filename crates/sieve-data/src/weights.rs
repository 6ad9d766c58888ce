//! Portfolio weights and their sector attribution.

use crate::error::{DataError, Result};
use crate::prices::SectorMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Ordered ticker to weight mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    entries: Vec<(String, f64)>,
}

impl WeightVector {
    /// Create a weight vector. Tickers must be unique and weights finite.
    pub fn new(entries: Vec<(String, f64)>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for (ticker, weight) in &entries {
            if ticker.is_empty() {
                return Err(DataError::InvalidWeights("empty ticker in weights".to_string()));
            }
            if !seen.insert(ticker.as_str()) {
                return Err(DataError::DuplicateTicker(ticker.clone()));
            }
            if !weight.is_finite() {
                return Err(DataError::InvalidWeights(format!(
                    "weight for {ticker} is not finite"
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Build from parallel ticker and weight slices, skipping zero weights.
    pub fn from_dense(tickers: &[String], weights: &[f64]) -> Result<Self> {
        if tickers.len() != weights.len() {
            return Err(DataError::InvalidWeights(format!(
                "{} tickers for {} weights",
                tickers.len(),
                weights.len()
            )));
        }
        Self::new(
            tickers
                .iter()
                .zip(weights)
                .filter(|(_, w)| **w != 0.0)
                .map(|(t, w)| (t.clone(), *w))
                .collect(),
        )
    }

    /// `(ticker, weight)` pairs in order.
    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    /// Tickers in order.
    pub fn tickers(&self) -> Vec<String> {
        self.entries.iter().map(|(t, _)| t.clone()).collect()
    }

    /// Weight of a ticker.
    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, w)| *w)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Number of non-zero weights.
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|(_, w)| *w != 0.0).count()
    }

    /// Per-ticker allocation rows with sector and percentage contribution.
    pub fn allocations(&self, sectors: &SectorMap) -> Vec<Allocation> {
        self.entries
            .iter()
            .map(|(ticker, weight)| Allocation {
                ticker: ticker.clone(),
                weight: *weight,
                sector: sectors.get(ticker).map(str::to_string),
                contribution: weight * 100.0,
            })
            .collect()
    }

    /// Total weight per sector; unmapped tickers are grouped under `"Unknown"`.
    pub fn sector_totals(&self, sectors: &SectorMap) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for (ticker, weight) in &self.entries {
            let sector = sectors.get(ticker).unwrap_or("Unknown").to_string();
            *totals.entry(sector).or_insert(0.0) += weight;
        }
        totals
    }
}

/// One exported allocation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Ticker symbol.
    pub ticker: String,
    /// Portfolio weight.
    pub weight: f64,
    /// Sector label.
    pub sector: Option<String>,
    /// Weight expressed as a percentage.
    pub contribution: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sectors() -> SectorMap {
        [("A", "Tech"), ("B", "Tech"), ("C", "Energy")]
            .into_iter()
            .map(|(t, s)| (t.to_string(), s.to_string()))
            .collect()
    }

    #[test]
    fn test_validation() {
        assert!(WeightVector::new(vec![("A".into(), 0.5), ("A".into(), 0.5)]).is_err());
        assert!(WeightVector::new(vec![("A".into(), f64::NAN)]).is_err());
        assert!(WeightVector::new(vec![(String::new(), 1.0)]).is_err());
    }

    #[test]
    fn test_from_dense_skips_zero() {
        let tickers = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let w = WeightVector::from_dense(&tickers, &[0.6, 0.0, 0.4]).unwrap();
        assert_eq!(w.len(), 2);
        assert_eq!(w.get("B"), None);
        assert_relative_eq!(w.total(), 1.0);
    }

    #[test]
    fn test_allocations_and_sector_totals() {
        let w = WeightVector::new(vec![
            ("A".into(), 0.25),
            ("B".into(), 0.25),
            ("C".into(), 0.4),
            ("D".into(), 0.1),
        ])
        .unwrap();

        let rows = w.allocations(&sectors());
        assert_eq!(rows[0].sector.as_deref(), Some("Tech"));
        assert_relative_eq!(rows[2].contribution, 40.0);
        assert_eq!(rows[3].sector, None);

        let totals = w.sector_totals(&sectors());
        assert_relative_eq!(totals["Tech"], 0.5);
        assert_relative_eq!(totals["Energy"], 0.4);
        assert_relative_eq!(totals["Unknown"], 0.1);
    }
}
