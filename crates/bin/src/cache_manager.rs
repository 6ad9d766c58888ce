//! Location of the persistent dataset store.

use sieve::data::{DataError, SqliteDatasetStore};
use std::path::PathBuf;

/// Get the default cache directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/sieve/`
/// - macOS: `~/Library/Caches/sieve/`
/// - Windows: `%LOCALAPPDATA%\sieve\cache\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sieve")
}

/// Get the store path, honoring `SIEVE_CACHE_PATH`.
pub(crate) fn cache_path() -> PathBuf {
    std::env::var_os("SIEVE_CACHE_PATH")
        .map_or_else(|| default_cache_dir().join("datasets.db"), PathBuf::from)
}

/// Open the store, creating the directory if needed.
pub(crate) fn open_store() -> Result<SqliteDatasetStore, DataError> {
    let path = cache_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    SqliteDatasetStore::new(&path)
}
