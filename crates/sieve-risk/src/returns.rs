//! Simple period returns.
//!
//! `r[t] = p[t] / p[t-1] - 1` for every ticker; the first date has no return
//! and is dropped, so a returns matrix has one row fewer than its prices.

use crate::error::{Result, RiskError};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, Axis};
use sieve_data::PriceMatrix;

/// Returns matrix: rows are dates (the later date of each pair), columns are tickers.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnsMatrix {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    values: Array2<f64>,
}

impl ReturnsMatrix {
    /// Create a returns matrix from labelled values.
    pub fn new(dates: Vec<NaiveDate>, tickers: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (dates.len(), tickers.len()) {
            return Err(RiskError::Shape(format!(
                "values {:?} for {} dates x {} tickers",
                values.dim(),
                dates.len(),
                tickers.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::NonFinite("returns contain NaN or infinity".to_string()));
        }
        Ok(Self {
            dates,
            tickers,
            values,
        })
    }

    /// Derive simple returns from a cleaned price matrix.
    ///
    /// # Errors
    ///
    /// [`RiskError::InsufficientHistory`] when there are fewer than two dates.
    pub fn from_prices(prices: &PriceMatrix) -> Result<Self> {
        let n_dates = prices.n_dates();
        if n_dates < 2 {
            return Err(RiskError::InsufficientHistory {
                required: 2,
                actual: n_dates,
            });
        }

        let p = prices.values();
        let prev = p.slice(ndarray::s![..n_dates - 1, ..]);
        let next = p.slice(ndarray::s![1.., ..]);
        let values = &next / &prev - 1.0;

        Self::new(
            prices.dates()[1..].to_vec(),
            prices.tickers().to_vec(),
            values,
        )
    }

    /// Return dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Ticker columns.
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Return values (periods x tickers).
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of return periods.
    pub fn n_periods(&self) -> usize {
        self.values.nrows()
    }

    /// Number of tickers.
    pub fn n_assets(&self) -> usize {
        self.values.ncols()
    }

    /// Historical mean return of each ticker.
    pub fn mean(&self) -> Array1<f64> {
        self.values
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.n_assets()))
    }

    /// Rebuild prices from `initial` (one price per ticker) by compounding.
    ///
    /// The output has one more row than the returns, the first being `initial`.
    pub fn compound(&self, initial: &[f64]) -> Result<Array2<f64>> {
        if initial.len() != self.n_assets() {
            return Err(RiskError::Shape(format!(
                "{} initial prices for {} tickers",
                initial.len(),
                self.n_assets()
            )));
        }

        let mut out = Array2::zeros((self.n_periods() + 1, self.n_assets()));
        out.row_mut(0).assign(&Array1::from(initial.to_vec()));
        for t in 0..self.n_periods() {
            let next = &out.row(t) * &self.values.row(t).mapv(|r| 1.0 + r);
            out.row_mut(t + 1).assign(&next);
        }
        Ok(out)
    }
}

/// Simple returns of one series.
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn prices() -> PriceMatrix {
        PriceMatrix::new(
            vec![d(1), d(4), d(5), d(6)],
            vec!["A".to_string(), "B".to_string()],
            array![[100.0, 50.0], [110.0, 45.0], [99.0, 45.0], [108.9, 54.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_returns_definition() {
        let prices = prices();
        let returns = ReturnsMatrix::from_prices(&prices).unwrap();

        assert_eq!(returns.n_periods(), 3);
        assert_eq!(returns.dates(), &[d(4), d(5), d(6)]);
        assert_eq!(returns.tickers(), prices.tickers());

        let p = prices.values();
        for t in 1..prices.n_dates() {
            for j in 0..prices.n_tickers() {
                assert_eq!(returns.values()[[t - 1, j]], p[[t, j]] / p[[t - 1, j]] - 1.0);
            }
        }
        assert_relative_eq!(returns.values()[[0, 0]], 0.1, epsilon = 1e-12);
        assert_relative_eq!(returns.values()[[2, 1]], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_compound_recovers_prices() {
        let prices = prices();
        let returns = ReturnsMatrix::from_prices(&prices).unwrap();
        let first: Vec<f64> = prices.values().row(0).to_vec();
        let rebuilt = returns.compound(&first).unwrap();

        for (a, b) in rebuilt.iter().zip(prices.values().iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_mean() {
        let returns = ReturnsMatrix::from_prices(&prices()).unwrap();
        let mean = returns.mean();
        assert_relative_eq!(mean[0], (0.1 - 0.1 + 0.1) / 3.0, epsilon = 1e-12);
        assert_relative_eq!(mean[1], (-0.1 + 0.0 + 0.2) / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_date_is_insufficient() {
        let prices = PriceMatrix::new(
            vec![d(1)],
            vec!["A".to_string(), "B".to_string()],
            array![[1.0, 2.0]],
        )
        .unwrap();
        assert!(matches!(
            ReturnsMatrix::from_prices(&prices),
            Err(RiskError::InsufficientHistory {
                required: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_simple_returns() {
        let r = simple_returns(&[100.0, 105.0, 110.25]);
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], 0.05, epsilon = 1e-12);
        assert_relative_eq!(r[1], 0.05, epsilon = 1e-12);
    }
}
