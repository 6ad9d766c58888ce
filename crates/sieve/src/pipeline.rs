//! Stage orchestration.
//!
//! `RawTable -> UniverseFilter -> Normalizer -> RiskEstimator ->
//! PortfolioOptimizer` produces weights; `backtest` evaluates a weight vector
//! against the benchmark row of the same dataset. Stages run in order and any
//! stage error ends the run.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::universe::Universe;
use sieve_data::{
    DataSource, DatasetCache, NormalizeConfig, Normalizer, PriceMatrix, PriceSeries, RawTable,
    SectorMap, UniverseTable, WeightVector,
};
use sieve_optimizer::{OptimizationResult, PortfolioOptimizer};
use sieve_output::WeightsExport;
use sieve_risk::{
    PerformanceError, PerformanceEvaluator, PerformanceReport, RiskEstimate, RiskEstimator,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Output of the screening stages.
#[derive(Debug, Clone)]
pub struct Screened {
    /// Rows that passed the universe filter
    pub universe: UniverseTable,
    /// Dense prices of the tickers that survived cleaning
    pub prices: PriceMatrix,
    /// Sector of every surviving ticker
    pub sectors: SectorMap,
}

/// Output of a full optimization run.
#[derive(Debug, Clone)]
pub struct PortfolioRun {
    /// Screening output
    pub screened: Screened,
    /// Returns, mean vector and covariance
    pub estimate: RiskEstimate,
    /// Optimized weights and diagnostics
    pub optimization: OptimizationResult,
}

impl PortfolioRun {
    /// The exportable weights table.
    pub fn weights_export(&self) -> WeightsExport {
        WeightsExport::new(&self.optimization.weights, &self.screened.sectors)
    }
}

/// Output of a backtest.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    /// Prices of the weighted tickers
    pub prices: PriceMatrix,
    /// Sector of every weighted ticker
    pub sectors: SectorMap,
    /// Benchmark history
    pub benchmark: PriceSeries,
    /// Series and metrics
    pub report: PerformanceReport,
}

/// Runs the pipeline stages with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
    cache: Option<Arc<DatasetCache>>,
}

impl Pipeline {
    /// Create a pipeline.
    pub const fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    /// Memoize loads through a shared dataset cache.
    pub fn with_cache(mut self, cache: Arc<DatasetCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The active configuration.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load a dataset, through the cache when one is attached.
    pub fn load(&self, source: &dyn DataSource) -> Result<Arc<RawTable>> {
        let table = match &self.cache {
            Some(cache) => cache.get_or_load(source)?,
            None => Arc::new(source.load()?),
        };
        debug!(source = %source.id(), rows = table.len(), "Loaded dataset");
        Ok(table)
    }

    /// Interpret the raw table with the configured schema.
    pub fn universe(&self, table: &RawTable) -> Result<UniverseTable> {
        Ok(table.universe(&self.config.schema)?)
    }

    /// Filter and normalize.
    ///
    /// # Errors
    ///
    /// Schema errors, an empty filtered universe, or fewer than two tickers
    /// after cleaning.
    pub fn screen(&self, table: &RawTable) -> Result<Screened> {
        let universe = self.config.universe.apply(&self.universe(table)?)?;
        let (prices, sectors) =
            Normalizer::new(self.config.normalize.clone()).normalize(&universe)?;
        Ok(Screened {
            universe,
            prices,
            sectors,
        })
    }

    /// Screen, estimate risk and optimize.
    pub fn optimize(&self, table: &RawTable) -> Result<PortfolioRun> {
        let screened = self.screen(table)?;
        let estimate = RiskEstimator::new(self.config.risk.clone()).estimate(&screened.prices)?;
        debug!(
            condition_number = estimate.condition_number(),
            shrinkage = ?estimate.shrinkage,
            "Covariance diagnostics"
        );
        let optimization =
            PortfolioOptimizer::new(self.config.optimizer.clone()).optimize_estimate(&estimate)?;

        info!(
            candidates = screened.prices.n_tickers(),
            holdings = optimization.weights.active_count(),
            "Portfolio constructed"
        );

        Ok(PortfolioRun {
            screened,
            estimate,
            optimization,
        })
    }

    /// Load `source` and run [`optimize`](Self::optimize).
    pub fn run(&self, source: &dyn DataSource) -> Result<PortfolioRun> {
        let table = self.load(source)?;
        self.optimize(&table)
    }

    /// Evaluate `weights` against the configured benchmark.
    ///
    /// Prices come from the unfiltered table restricted to the weighted
    /// tickers, cleaned with the configured missing-data policy.
    ///
    /// # Errors
    ///
    /// - [`PerformanceError::MissingTicker`] when a weighted ticker is absent
    ///   from the table or dropped by cleaning
    /// - [`PerformanceError::NoOverlap`] when the benchmark shares no dates
    ///   with the portfolio
    /// - [`sieve_data::DataError::UnknownTicker`] when the benchmark is absent
    pub fn backtest(&self, table: &RawTable, weights: &WeightVector) -> Result<BacktestRun> {
        if weights.is_empty() {
            return Err(PerformanceError::EmptyWeights.into());
        }
        let universe = self.universe(table)?;
        let benchmark = universe.price_series(&self.config.benchmark)?;

        if let Some((ticker, _)) = weights.entries().iter().find(|(t, _)| !universe.contains(t)) {
            return Err(PerformanceError::MissingTicker(ticker.clone()).into());
        }

        let held = universe.retain_rows(|row| weights.get(&row.ticker).is_some());
        let normalize = NormalizeConfig {
            min_tickers: 1,
            ..self.config.normalize.clone()
        };
        let (prices, sectors) = Normalizer::new(normalize).normalize(&held)?;

        let report = PerformanceEvaluator::new(self.config.performance.clone())
            .evaluate(&prices, weights, &benchmark)?;

        info!(
            holdings = weights.len(),
            dates = report.series.len(),
            total_return = report.portfolio.total_return,
            alpha = report.alpha,
            "Backtest complete"
        );

        Ok(BacktestRun {
            prices,
            sectors,
            benchmark,
            report,
        })
    }
}
