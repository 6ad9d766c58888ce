//! Data source collaborators.
//!
//! A source produces a [`RawTable`] from somewhere; the pipeline never knows
//! where. Sources are explicit: a failing source is an error, there is no
//! fallback to another location.

pub mod csv;
pub mod http;

pub use self::csv::{CsvFileSource, CsvTextSource};
pub use self::http::HttpCsvSource;

use crate::error::{DataError, Result};
use crate::table::RawTable;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Trait for dataset providers
pub trait DataSource: fmt::Debug {
    /// Stable identity of the source, used as the cache key.
    fn id(&self) -> String;

    /// Load the full table.
    fn load(&self) -> Result<RawTable>;
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn id(&self) -> String {
        (**self).id()
    }

    fn load(&self) -> Result<RawTable> {
        (**self).load()
    }
}

/// Retry policy for transient source failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first (default: 2, i.e. one retry)
    pub max_attempts: u32,
    /// Delay before the first retry (default: 500ms)
    pub initial_backoff: Duration,
    /// Backoff growth factor between retries (default: 2.0)
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.saturating_sub(1) as i32);
        self.initial_backoff.mul_f64(factor)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only errors for which [`DataError::is_transient`] holds are retried.
    pub fn run<T, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    let delay = self.backoff(attempt);
                    warn!(attempt, ?delay, error = %err, "Transient source failure, retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Build a [`DataError::Source`] for the given source identity.
pub(crate) fn source_error(source_id: &str, reason: impl Into<String>) -> DataError {
    DataError::Source {
        source_id: source_id.to_string(),
        reason: reason.into(),
    }
}
