#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sieve/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod universe;

// Re-export main types from sub-crates
pub use sieve_data as data;
pub use sieve_optimizer as optimizer;
pub use sieve_output as output;
pub use sieve_risk as risk;

pub use config::{DEFAULT_BENCHMARK, PipelineConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{BacktestRun, Pipeline, PortfolioRun, Screened};
pub use universe::{Universe, UniverseFilter, available_exchanges, available_sectors};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
