#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sieve/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod covariance;
pub mod error;
pub mod estimator;
pub mod performance;
pub mod returns;

// Re-export main types
pub use covariance::{
    CovarianceError, CovarianceEstimator, LedoitWolfConfig, LedoitWolfEstimator,
    SampleCovarianceEstimator, ShrunkCovariance,
};
pub use error::{Result, RiskError};
pub use estimator::{CovarianceMethod, RiskConfig, RiskEstimate, RiskEstimator};
pub use performance::{
    Metrics, MetricsRecord, PerformanceConfig, PerformanceError, PerformanceEvaluator,
    PerformanceReport, PerformanceSeries, Rebalancing, TRADING_DAYS, evaluate,
};
pub use returns::ReturnsMatrix;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
