#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sieve/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod constraints;
pub mod error;
pub mod objective;
pub mod optimizer;
pub mod projection;

pub use config::{Objective, OptimizerConfig};
pub use constraints::{Infeasibility, NormalizedConstraints};
pub use error::{OptimizerError, Result};
pub use optimizer::{OptimizationResult, PortfolioOptimizer};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
