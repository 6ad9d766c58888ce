//! CSV-backed sources: a local file or text already in memory.

use super::{DataSource, source_error};
use crate::error::Result;
use crate::table::RawTable;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Reads the universe table from a CSV file on disk.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    /// Create a source for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for CsvFileSource {
    fn id(&self) -> String {
        format!("file://{}", self.path.display())
    }

    fn load(&self) -> Result<RawTable> {
        let file = File::open(&self.path)?;
        let table = RawTable::from_csv_reader(BufReader::new(file))?;
        if table.headers().is_empty() {
            return Err(source_error(&self.id(), "file has no header row"));
        }
        Ok(table)
    }
}

/// Serves a table from CSV text held in memory (uploads, fixtures).
#[derive(Debug, Clone)]
pub struct CsvTextSource {
    name: String,
    text: String,
}

impl CsvTextSource {
    /// Create a source named `name` over `text`.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

impl DataSource for CsvTextSource {
    fn id(&self) -> String {
        format!("memory://{}", self.name)
    }

    fn load(&self) -> Result<RawTable> {
        let table = RawTable::from_csv_str(&self.text)?;
        if table.headers().is_empty() {
            return Err(source_error(&self.id(), "text has no header row"));
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use std::io::Write;

    #[test]
    fn test_file_source_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Ticker,Sector,2024-01-02").unwrap();
        writeln!(file, "AAPL,Tech,185").unwrap();

        let source = CsvFileSource::new(file.path());
        let table = source.load().unwrap();
        assert_eq!(table.len(), 1);
        assert!(source.id().starts_with("file://"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let source = CsvFileSource::new("/definitely/not/here.csv");
        assert!(matches!(source.load(), Err(DataError::Io(_))));
    }

    #[test]
    fn test_text_source() {
        let source = CsvTextSource::new("fixture", "Ticker,Sector\nA,Tech\n");
        assert_eq!(source.id(), "memory://fixture");
        assert_eq!(source.load().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_text_has_no_header() {
        let source = CsvTextSource::new("empty", "");
        assert!(matches!(source.load(), Err(DataError::Source { .. })));
    }
}
