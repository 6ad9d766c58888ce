//! Universe selection.
//!
//! A universe is the candidate set of tickers before any optimization.
//! [`UniverseFilter`] narrows the loaded table by sector, exchange and market
//! capitalization.

pub mod filter;

pub use filter::{UniverseFilter, available_exchanges, available_sectors};

use sieve_data::UniverseTable;

/// Trait for stock universes.
pub trait Universe {
    /// Get all symbols in the universe.
    fn symbols(&self) -> Vec<String>;

    /// Check if a symbol is in the universe.
    fn contains(&self, symbol: &str) -> bool {
        self.symbols().iter().any(|s| s == symbol)
    }

    /// Get the number of constituents.
    fn size(&self) -> usize {
        self.symbols().len()
    }
}

impl Universe for UniverseTable {
    fn symbols(&self) -> Vec<String> {
        self.tickers()
    }

    fn contains(&self, symbol: &str) -> bool {
        self.row(symbol).is_some()
    }

    fn size(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_data::{ColumnSchema, RawTable};

    #[test]
    fn test_universe_trait() {
        let csv = "Ticker,Sector,2024-01-02\nAAPL,Tech,1\nXOM,Energy,2\n";
        let universe = RawTable::from_csv_str(csv)
            .unwrap()
            .universe(&ColumnSchema::default())
            .unwrap();

        assert!(universe.contains("AAPL"));
        assert!(!universe.contains("NOTREAL"));
        assert_eq!(universe.size(), 2);
        assert_eq!(universe.symbols(), vec!["AAPL", "XOM"]);
    }
}
