//! Cleaned price containers and the ticker-to-sector lookup.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

fn check_dates(dates: &[NaiveDate]) -> Result<()> {
    if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
        return Err(DataError::InvalidPrices(format!(
            "dates must be strictly increasing ({} then {})",
            w[0], w[1]
        )));
    }
    Ok(())
}

/// Dense price matrix: rows are dates, columns are tickers.
///
/// Dates are strictly increasing, tickers are unique and every value is a
/// finite, strictly positive price.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatrix {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    values: Array2<f64>,
}

impl PriceMatrix {
    /// Create a price matrix, validating shape, ordering and values.
    pub fn new(dates: Vec<NaiveDate>, tickers: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (dates.len(), tickers.len()) {
            return Err(DataError::InvalidPrices(format!(
                "shape {:?} does not match {} dates x {} tickers",
                values.dim(),
                dates.len(),
                tickers.len()
            )));
        }
        check_dates(&dates)?;

        let mut seen = HashSet::with_capacity(tickers.len());
        if let Some(dup) = tickers.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(DataError::DuplicateTicker(dup.clone()));
        }

        if let Some(((row, col), v)) = values
            .indexed_iter()
            .find(|(_, v)| !v.is_finite() || **v <= 0.0)
        {
            return Err(DataError::InvalidPrices(format!(
                "{} on {} has non-positive or missing price {v}",
                tickers[col], dates[row]
            )));
        }

        Ok(Self {
            dates,
            tickers,
            values,
        })
    }

    /// Observation dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Ticker columns.
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Price values (dates x tickers).
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of dates.
    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    /// Number of tickers.
    pub fn n_tickers(&self) -> usize {
        self.tickers.len()
    }

    /// Column index of a ticker.
    pub fn position(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    /// Price history of one ticker.
    pub fn column(&self, ticker: &str) -> Option<ArrayView1<'_, f64>> {
        self.position(ticker).map(|i| self.values.column(i))
    }

    /// Restrict to the given tickers, in the given order.
    pub fn select(&self, tickers: &[String]) -> Result<Self> {
        let indices = tickers
            .iter()
            .map(|t| {
                self.position(t)
                    .ok_or_else(|| DataError::UnknownTicker(t.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(
            self.dates.clone(),
            tickers.to_vec(),
            self.values.select(Axis(1), &indices),
        )
    }

    /// Restrict to the rows whose date is in `dates`.
    pub fn restrict_dates(&self, dates: &[NaiveDate]) -> Self {
        let wanted: HashSet<&NaiveDate> = dates.iter().collect();
        let rows: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| wanted.contains(d))
            .map(|(i, _)| i)
            .collect();

        Self {
            dates: rows.iter().map(|&i| self.dates[i]).collect(),
            tickers: self.tickers.clone(),
            values: self.values.select(Axis(0), &rows),
        }
    }
}

/// A single ticker's price history, e.g. the benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl PriceSeries {
    /// Create a price series. Dates must be strictly increasing and prices positive.
    pub fn new(ticker: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        let ticker = ticker.into();
        if dates.len() != values.len() {
            return Err(DataError::InvalidPrices(format!(
                "{ticker}: {} dates for {} values",
                dates.len(),
                values.len()
            )));
        }
        check_dates(&dates)?;
        if let Some(v) = values.iter().find(|v| !v.is_finite() || **v <= 0.0) {
            return Err(DataError::InvalidPrices(format!(
                "{ticker} has non-positive or missing price {v}"
            )));
        }
        Ok(Self {
            ticker,
            dates,
            values,
        })
    }

    /// Ticker symbol.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Observation dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Prices.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Price on a given date.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }
}

/// Ticker to sector label lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorMap {
    sectors: BTreeMap<String, String>,
}

impl SectorMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a sector to a ticker.
    pub fn insert(&mut self, ticker: impl Into<String>, sector: impl Into<String>) {
        self.sectors.insert(ticker.into(), sector.into());
    }

    /// Sector of a ticker.
    pub fn get(&self, ticker: &str) -> Option<&str> {
        self.sectors.get(ticker).map(String::as_str)
    }

    /// Number of tickers mapped.
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Iterate over `(ticker, sector)` pairs in ticker order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sectors.iter().map(|(t, s)| (t.as_str(), s.as_str()))
    }

    /// Keep only the given tickers.
    pub fn restrict_to(&self, tickers: &[String]) -> Self {
        tickers
            .iter()
            .filter_map(|t| self.sectors.get_key_value(t))
            .map(|(t, s)| (t.clone(), s.clone()))
            .collect()
    }
}

impl FromIterator<(String, String)> for SectorMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            sectors: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn tickers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_price_matrix_validation() {
        let ok = PriceMatrix::new(
            vec![d(2), d(3)],
            tickers(&["A", "B"]),
            array![[1.0, 2.0], [1.1, 2.1]],
        );
        assert!(ok.is_ok());

        let unsorted = PriceMatrix::new(
            vec![d(3), d(2)],
            tickers(&["A", "B"]),
            array![[1.0, 2.0], [1.1, 2.1]],
        );
        assert!(matches!(unsorted, Err(DataError::InvalidPrices(_))));

        let duplicate = PriceMatrix::new(
            vec![d(2), d(3)],
            tickers(&["A", "A"]),
            array![[1.0, 2.0], [1.1, 2.1]],
        );
        assert!(matches!(duplicate, Err(DataError::DuplicateTicker(_))));

        let missing = PriceMatrix::new(
            vec![d(2), d(3)],
            tickers(&["A", "B"]),
            array![[1.0, f64::NAN], [1.1, 2.1]],
        );
        assert!(matches!(missing, Err(DataError::InvalidPrices(_))));

        let shape = PriceMatrix::new(vec![d(2)], tickers(&["A", "B"]), array![[1.0, 2.0], [1.1, 2.1]]);
        assert!(shape.is_err());
    }

    #[test]
    fn test_select_and_restrict() {
        let m = PriceMatrix::new(
            vec![d(2), d(3), d(4)],
            tickers(&["A", "B", "C"]),
            array![[1.0, 2.0, 3.0], [1.1, 2.1, 3.1], [1.2, 2.2, 3.2]],
        )
        .unwrap();

        let sub = m.select(&tickers(&["C", "A"])).unwrap();
        assert_eq!(sub.tickers(), &["C", "A"]);
        assert_eq!(sub.values()[[1, 0]], 3.1);

        assert!(matches!(
            m.select(&tickers(&["Z"])),
            Err(DataError::UnknownTicker(_))
        ));

        let window = m.restrict_dates(&[d(4), d(2)]);
        assert_eq!(window.dates(), &[d(2), d(4)]);
        assert_eq!(window.column("B").unwrap().to_vec(), vec![2.0, 2.2]);
    }

    #[test]
    fn test_price_series_lookup() {
        let s = PriceSeries::new("SPY", vec![d(2), d(3)], vec![100.0, 101.0]).unwrap();
        assert_eq!(s.get(d(3)), Some(101.0));
        assert_eq!(s.get(d(9)), None);
        assert!(PriceSeries::new("SPY", vec![d(2)], vec![0.0]).is_err());
    }

    #[test]
    fn test_sector_map_restrict() {
        let map: SectorMap = [("A", "Tech"), ("B", "Energy")]
            .into_iter()
            .map(|(t, s)| (t.to_string(), s.to_string()))
            .collect();

        let sub = map.restrict_to(&tickers(&["B", "Z"]));
        assert_eq!(sub.len(), 1);
        assert_eq!(sub.get("B"), Some("Energy"));
        assert_eq!(sub.get("A"), None);
    }
}
