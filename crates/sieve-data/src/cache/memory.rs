//! In-memory dataset cache keyed by source identity.
//!
//! Entries are immutable once loaded and handed out as `Arc<RawTable>`, so
//! concurrent runs can share them read-only. Expiry is caller-controlled: an
//! optional TTL plus explicit `refresh` and `invalidate`.

use crate::error::{DataError, Result};
use crate::source::DataSource;
use crate::table::RawTable;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

/// A cached table with its fetch timestamp.
#[derive(Debug, Clone)]
pub struct CachedDataset {
    /// The loaded table.
    pub table: Arc<RawTable>,
    /// Wall-clock time the table was fetched.
    pub fetched_at: DateTime<Utc>,
    loaded: Instant,
}

impl CachedDataset {
    fn new(table: RawTable) -> Self {
        Self {
            table: Arc::new(table),
            fetched_at: Utc::now(),
            loaded: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        ttl.is_none_or(|ttl| self.loaded.elapsed() < ttl)
    }
}

/// Explicit, caller-owned dataset cache.
#[derive(Debug, Default)]
pub struct DatasetCache {
    ttl: Option<Duration>,
    entries: Mutex<HashMap<String, CachedDataset>>,
}

impl DatasetCache {
    /// Create a cache. `None` means entries never expire on their own.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The configured time-to-live.
    pub const fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CachedDataset>>> {
        self.entries
            .lock()
            .map_err(|e| DataError::Cache(format!("cache lock poisoned: {e}")))
    }

    /// Return the cached table for `source`, loading it if absent or expired.
    pub fn get_or_load(&self, source: &dyn DataSource) -> Result<Arc<RawTable>> {
        let id = source.id();
        if let Some(entry) = self.lock()?.get(&id)
            && entry.is_fresh(self.ttl)
        {
            debug!(source = %id, "Dataset cache hit");
            return Ok(Arc::clone(&entry.table));
        }

        debug!(source = %id, "Dataset cache miss");
        self.refresh(source)
    }

    /// Load `source` unconditionally and replace any cached entry.
    pub fn refresh(&self, source: &dyn DataSource) -> Result<Arc<RawTable>> {
        let id = source.id();
        // Load outside the lock so other sources stay readable meanwhile.
        let entry = CachedDataset::new(source.load()?);
        let table = Arc::clone(&entry.table);
        self.lock()?.insert(id, entry);
        Ok(table)
    }

    /// Drop the entry for a source identity. Returns whether one existed.
    pub fn invalidate(&self, source_id: &str) -> Result<bool> {
        Ok(self.lock()?.remove(source_id).is_some())
    }

    /// Drop every entry.
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    /// Fetch timestamp of a cached source, if present.
    pub fn fetched_at(&self, source_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.lock()?.get(source_id).map(|e| e.fetched_at))
    }

    /// Number of cached entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}
