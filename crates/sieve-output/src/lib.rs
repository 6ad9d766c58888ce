#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sieve/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod frame;
pub mod report;

pub use export::{
    ExportError, ExportFormat, Exporter, MetricsExport, PERFORMANCE_HEADER, PerformanceExport,
    PerformanceRow, WEIGHTS_HEADER, WeightRow, WeightsExport,
};
pub use frame::{allocations_frame, performance_frame, prices_frame};
pub use report::{OptimizationSummary, Report, ReportBuilder, ReportError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
