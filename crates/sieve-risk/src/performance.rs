//! Performance evaluation of a weighted portfolio against a benchmark.
//!
//! Prices are restricted to the weighted tickers, aligned with the benchmark
//! on their common dates and normalized to 1.0 on the first of them. Metrics
//! are computed identically for both series from their period returns.

use crate::returns::simple_returns;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sieve_data::{PriceMatrix, PriceSeries, WeightVector};
use thiserror::Error;
use tracing::{debug, info};

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Daily return dispersion at or below this is treated as zero.
const MIN_STD: f64 = 1e-12;

/// Serde for metrics that may be undefined: NaN is written as `null` and
/// `null` reads back as NaN.
mod nullable_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// Errors raised by the performance evaluator.
#[derive(Debug, Error)]
pub enum PerformanceError {
    /// A weighted ticker has no prices.
    #[error("Weighted ticker {0} is not in the price matrix")]
    MissingTicker(String),

    /// Portfolio and benchmark share no date.
    #[error("Portfolio and benchmark dates do not overlap")]
    NoOverlap,

    /// Nothing to evaluate.
    #[error("Weight vector is empty")]
    EmptyWeights,
}

/// How the weighted portfolio evolves between dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rebalancing {
    /// Weights are restored every period: the portfolio return is the
    /// weighted sum of ticker returns.
    #[default]
    Daily,
    /// Weights are set once: the portfolio value is the weighted sum of the
    /// normalized ticker prices.
    BuyAndHold,
}

/// Performance evaluator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Portfolio evolution (default: daily rebalancing)
    pub rebalancing: Rebalancing,
    /// Periods per year for annualization (default: 252)
    pub periods_per_year: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            rebalancing: Rebalancing::Daily,
            periods_per_year: TRADING_DAYS,
        }
    }
}

/// Cumulative value of the portfolio and the benchmark on shared dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSeries {
    dates: Vec<NaiveDate>,
    portfolio: Vec<f64>,
    benchmark: Vec<f64>,
}

impl PerformanceSeries {
    /// Aligned dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Portfolio value, 1.0 at the first date.
    pub fn portfolio(&self) -> &[f64] {
        &self.portfolio
    }

    /// Benchmark value, 1.0 at the first date.
    pub fn benchmark(&self) -> &[f64] {
        &self.benchmark
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// `(date, portfolio, benchmark)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, f64, f64)> + '_ {
        self.dates
            .iter()
            .zip(&self.portfolio)
            .zip(&self.benchmark)
            .map(|((d, p), b)| (*d, *p, *b))
    }
}

/// Summary metrics of one cumulative value series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// `last_value - 1`
    #[serde(with = "nullable_f64")]
    pub total_return: f64,
    /// Annualized `mean / std` of period returns; NaN when undefined
    #[serde(with = "nullable_f64")]
    pub sharpe: f64,
    /// `min(value / running_max - 1)`, zero or negative
    pub max_drawdown: f64,
}

impl Metrics {
    /// Compute metrics of a value series normalized to 1.0 at its start.
    pub fn from_values(values: &[f64], periods_per_year: f64) -> Self {
        let total_return = values.last().map_or(f64::NAN, |v| v - 1.0);
        Self {
            total_return,
            sharpe: sharpe_ratio(&simple_returns(values), periods_per_year),
            max_drawdown: max_drawdown(values),
        }
    }
}

/// Annualized Sharpe ratio of period returns (no risk-free adjustment).
///
/// Uses the sample standard deviation. Returns NaN for fewer than two
/// returns or a zero standard deviation.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    if std <= MIN_STD {
        return f64::NAN;
    }
    mean / std * periods_per_year.sqrt()
}

/// Deepest decline from a running peak.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        worst = worst.min(v / peak - 1.0);
    }
    worst
}

/// Flat metrics record with the exported key names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Total return in percent
    #[serde(rename = "Total Return (%)", with = "nullable_f64")]
    pub total_return_pct: f64,
    /// Annualized Sharpe ratio
    #[serde(rename = "Sharpe Ratio", with = "nullable_f64")]
    pub sharpe_ratio: f64,
    /// Maximum drawdown in percent
    #[serde(rename = "Max Drawdown (%)")]
    pub max_drawdown_pct: f64,
    /// Annualized mean excess return over the benchmark
    #[serde(
        rename = "Alpha (vs Benchmark)",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub alpha: Option<f64>,
}

/// Result of [`PerformanceEvaluator::evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Aligned cumulative series
    pub series: PerformanceSeries,
    /// Portfolio metrics
    pub portfolio: Metrics,
    /// Benchmark metrics
    pub benchmark: Metrics,
    /// `mean(portfolio_return - benchmark_return) * periods_per_year`
    #[serde(with = "nullable_f64")]
    pub alpha: f64,
}

impl PerformanceReport {
    /// Portfolio metrics with alpha, as exported.
    pub const fn portfolio_record(&self) -> MetricsRecord {
        MetricsRecord {
            total_return_pct: self.portfolio.total_return * 100.0,
            sharpe_ratio: self.portfolio.sharpe,
            max_drawdown_pct: self.portfolio.max_drawdown * 100.0,
            alpha: Some(self.alpha),
        }
    }

    /// Benchmark metrics, as exported (no alpha).
    pub const fn benchmark_record(&self) -> MetricsRecord {
        MetricsRecord {
            total_return_pct: self.benchmark.total_return * 100.0,
            sharpe_ratio: self.benchmark.sharpe,
            max_drawdown_pct: self.benchmark.max_drawdown * 100.0,
            alpha: None,
        }
    }
}

/// Evaluates portfolios against a benchmark.
#[derive(Debug, Clone, Default)]
pub struct PerformanceEvaluator {
    config: PerformanceConfig,
}

impl PerformanceEvaluator {
    /// Create an evaluator with the given configuration
    pub const fn new(config: PerformanceConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub const fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    /// Evaluate `weights` over `prices` against `benchmark`.
    ///
    /// Weights are used as given.
    ///
    /// # Errors
    ///
    /// - [`PerformanceError::MissingTicker`] for a weighted ticker absent from `prices`
    /// - [`PerformanceError::NoOverlap`] when no date is shared with the benchmark
    pub fn evaluate(
        &self,
        prices: &PriceMatrix,
        weights: &WeightVector,
        benchmark: &PriceSeries,
    ) -> Result<PerformanceReport, PerformanceError> {
        if weights.is_empty() {
            return Err(PerformanceError::EmptyWeights);
        }

        let columns = weights
            .entries()
            .iter()
            .map(|(ticker, w)| {
                prices
                    .position(ticker)
                    .map(|j| (j, *w))
                    .ok_or_else(|| PerformanceError::MissingTicker(ticker.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let common: Vec<(usize, f64)> = prices
            .dates()
            .iter()
            .enumerate()
            .filter_map(|(i, d)| benchmark.get(*d).map(|b| (i, b)))
            .collect();
        let Some(&(first_row, first_bench)) = common.first() else {
            return Err(PerformanceError::NoOverlap);
        };
        debug!(
            price_dates = prices.n_dates(),
            benchmark_dates = benchmark.len(),
            common = common.len(),
            "Aligned portfolio and benchmark"
        );

        let p = prices.values();
        let normalized = |row: usize, col: usize| p[[row, col]] / p[[first_row, col]];

        let portfolio: Vec<f64> = match self.config.rebalancing {
            Rebalancing::BuyAndHold => common
                .iter()
                .map(|&(row, _)| {
                    columns
                        .iter()
                        .map(|&(j, w)| w * normalized(row, j))
                        .sum::<f64>()
                })
                .collect(),
            Rebalancing::Daily => {
                let mut value = 1.0;
                let mut out = Vec::with_capacity(common.len());
                out.push(value);
                for pair in common.windows(2) {
                    let (prev, row) = (pair[0].0, pair[1].0);
                    let r: f64 = columns
                        .iter()
                        .map(|&(j, w)| w * (p[[row, j]] / p[[prev, j]] - 1.0))
                        .sum();
                    value *= 1.0 + r;
                    out.push(value);
                }
                out
            }
        };
        let bench: Vec<f64> = common.iter().map(|&(_, b)| b / first_bench).collect();

        let per_year = self.config.periods_per_year;
        let portfolio_metrics = Metrics::from_values(&portfolio, per_year);
        let benchmark_metrics = Metrics::from_values(&bench, per_year);

        let excess: Vec<f64> = simple_returns(&portfolio)
            .into_iter()
            .zip(simple_returns(&bench))
            .map(|(rp, rb)| rp - rb)
            .collect();
        let alpha = if excess.is_empty() {
            f64::NAN
        } else {
            excess.iter().sum::<f64>() / excess.len() as f64 * per_year
        };

        info!(
            dates = common.len(),
            total_return = portfolio_metrics.total_return,
            sharpe = portfolio_metrics.sharpe,
            max_drawdown = portfolio_metrics.max_drawdown,
            alpha,
            "Evaluated portfolio performance"
        );

        Ok(PerformanceReport {
            series: PerformanceSeries {
                dates: common.iter().map(|&(i, _)| prices.dates()[i]).collect(),
                portfolio,
                benchmark: bench,
            },
            portfolio: portfolio_metrics,
            benchmark: benchmark_metrics,
            alpha,
        })
    }
}

/// Evaluate with the default configuration (daily rebalancing, 252 periods a year).
pub fn evaluate(
    prices: &PriceMatrix,
    weights: &WeightVector,
    benchmark: &PriceSeries,
) -> Result<PerformanceReport, PerformanceError> {
    PerformanceEvaluator::default().evaluate(prices, weights, benchmark)
}
