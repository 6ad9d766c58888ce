//! Pipeline configuration.

use crate::error::{PipelineError, Result};
use crate::universe::UniverseFilter;
use serde::{Deserialize, Serialize};
use sieve_data::{ColumnSchema, NormalizeConfig};
use sieve_optimizer::OptimizerConfig;
use sieve_risk::{PerformanceConfig, RiskConfig};
use std::path::Path;

/// Default benchmark ticker.
pub const DEFAULT_BENCHMARK: &str = "SPY";

/// Settings for every pipeline stage.
///
/// Every field has a default, so a JSON file only needs the values it
/// changes:
///
/// ```json
/// {
///   "universe": { "sectors": ["Technology"], "min_market_cap_billions": 10 },
///   "normalize": { "max_missing_fraction": 0.3 },
///   "optimizer": { "objective": "min-risk", "max_holdings": 10 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Universe filter
    pub universe: UniverseFilter,

    /// Column naming of the raw table
    pub schema: ColumnSchema,

    /// Missing-data policy
    pub normalize: NormalizeConfig,

    /// Covariance estimation
    pub risk: RiskConfig,

    /// Objective and constraints
    pub optimizer: OptimizerConfig,

    /// Backtest settings
    pub performance: PerformanceConfig,

    /// Benchmark ticker, looked up in the same dataset
    pub benchmark: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            universe: UniverseFilter::default(),
            schema: ColumnSchema::default(),
            normalize: NormalizeConfig::default(),
            risk: RiskConfig::default(),
            optimizer: OptimizerConfig::default(),
            performance: PerformanceConfig::default(),
            benchmark: DEFAULT_BENCHMARK.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON configuration.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if self.benchmark.trim().is_empty() {
            return Err(PipelineError::Config(
                "benchmark ticker must not be empty".to_string(),
            ));
        }
        if self.optimizer.periods_per_year != self.performance.periods_per_year {
            tracing::warn!(
                optimizer = self.optimizer.periods_per_year,
                performance = self.performance.periods_per_year,
                "Optimizer and backtest annualize with different period counts"
            );
        }
        Ok(())
    }
}
