//! SQLite persistence for fetched datasets.
//!
//! Stores the raw CSV payload of a source keyed by its identity, together with
//! the fetch timestamp, so a later run can reuse it instead of fetching again.

use crate::error::{DataError, Result};
use crate::source::DataSource;
use crate::table::RawTable;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::{debug, info};

/// SQLite store for raw datasets.
#[derive(Debug)]
pub struct SqliteDatasetStore {
    conn: Connection,
}

/// A dataset read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDataset {
    /// Source identity.
    pub source_id: String,
    /// The stored table.
    pub table: RawTable,
    /// When the table was fetched from its source.
    pub fetched_at: DateTime<Utc>,
}

impl SqliteDatasetStore {
    /// Open (or create) a store at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS datasets (
                source_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                rows INTEGER NOT NULL,
                fetched_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Store a table for a source, replacing any previous payload.
    pub fn put(&self, source_id: &str, table: &RawTable, fetched_at: DateTime<Utc>) -> Result<()> {
        let payload = table.to_csv_string()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO datasets (source_id, payload, rows, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                source_id,
                payload,
                table.len() as i64,
                fetched_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Read a stored table.
    pub fn get(&self, source_id: &str) -> Result<Option<StoredDataset>> {
        let row = self
            .conn
            .query_row(
                "SELECT payload, fetched_at FROM datasets WHERE source_id = ?1",
                params![source_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((payload, fetched_at)) = row else {
            return Ok(None);
        };

        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map_err(|e| DataError::Cache(format!("bad timestamp for {source_id}: {e}")))?
            .with_timezone(&Utc);

        Ok(Some(StoredDataset {
            source_id: source_id.to_string(),
            table: RawTable::from_csv_str(&payload)?,
            fetched_at,
        }))
    }

    /// Remove a stored table. Returns whether one existed.
    pub fn remove(&self, source_id: &str) -> Result<bool> {
        let n = self.conn.execute(
            "DELETE FROM datasets WHERE source_id = ?1",
            params![source_id],
        )?;
        Ok(n > 0)
    }

    /// List `(source_id, rows, fetched_at)` for every stored dataset.
    pub fn list(&self) -> Result<Vec<(String, usize, DateTime<Utc>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source_id, rows, fetched_at FROM datasets ORDER BY source_id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, n, ts) = row?;
            let ts = DateTime::parse_from_rfc3339(&ts)
                .map_err(|e| DataError::Cache(format!("bad timestamp for {id}: {e}")))?
                .with_timezone(&Utc);
            out.push((id, n as usize, ts));
        }
        Ok(out)
    }

    /// Remove every stored dataset.
    pub fn clear(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM datasets", [])?)
    }
}

/// A source that reads through a [`SqliteDatasetStore`].
///
/// A stored payload younger than `max_age` is returned without touching the
/// inner source; otherwise the inner source is loaded and the store updated.
#[derive(Debug)]
pub struct StoredSource<S> {
    inner: S,
    store: SqliteDatasetStore,
    max_age: Option<Duration>,
    force_refresh: bool,
}

impl<S: DataSource> StoredSource<S> {
    /// Wrap `inner`. `max_age` of `None` means stored data never goes stale.
    pub fn new(inner: S, store: SqliteDatasetStore, max_age: Option<Duration>) -> Self {
        Self {
            inner,
            store,
            max_age,
            force_refresh: false,
        }
    }

    /// Ignore stored data and always reload from the inner source.
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// The backing store.
    pub const fn store(&self) -> &SqliteDatasetStore {
        &self.store
    }
}

impl<S: DataSource> DataSource for StoredSource<S> {
    fn id(&self) -> String {
        self.inner.id()
    }

    fn load(&self) -> Result<RawTable> {
        let id = self.inner.id();

        if !self.force_refresh
            && let Some(stored) = self.store.get(&id)?
        {
            let age = Utc::now() - stored.fetched_at;
            if self.max_age.is_none_or(|max| age < max) {
                debug!(source = %id, fetched_at = %stored.fetched_at, "Using stored dataset");
                return Ok(stored.table);
            }
            debug!(source = %id, "Stored dataset is stale");
        }

        let table = self.inner.load()?;
        self.store.put(&id, &table, Utc::now())?;
        info!(source = %id, rows = table.len(), "Stored fresh dataset");
        Ok(table)
    }
}
