//! Named column schema for the raw universe table.
//!
//! Metadata columns are identified by name, never by position. Every header
//! that is not a metadata column (and not explicitly excluded) is a candidate
//! price column; whether it actually holds prices is decided later by parsing
//! its label as a date.

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};

/// Resolved positions of the metadata columns within a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    /// Index of the ticker column.
    pub ticker: usize,
    /// Index of the sector column.
    pub sector: usize,
    /// Index of the company name column, if present.
    pub company: Option<usize>,
    /// Index of the exchange column, if present.
    pub exchange: Option<usize>,
    /// Index of the market capitalization column, if present.
    pub market_cap: Option<usize>,
    /// Indices of the candidate price columns, in header order.
    pub price_columns: Vec<usize>,
}

/// Column naming contract for the raw universe table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSchema {
    /// Ticker column (required).
    pub ticker: String,
    /// Sector column (required).
    pub sector: String,
    /// Company name column (optional).
    pub company: Option<String>,
    /// Exchange column (optional).
    pub exchange: Option<String>,
    /// Market capitalization column in raw dollars (optional).
    pub market_cap: Option<String>,
    /// Additional non-price columns to ignore.
    pub excluded: Vec<String>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            ticker: "Ticker".to_string(),
            sector: "Sector".to_string(),
            company: Some("Company".to_string()),
            exchange: Some("Exchange".to_string()),
            market_cap: Some("Marketcap".to_string()),
            excluded: Vec::new(),
        }
    }
}

impl ColumnSchema {
    /// All metadata column names this schema knows about.
    pub fn metadata_names(&self) -> Vec<&str> {
        let mut names = vec![self.ticker.as_str(), self.sector.as_str()];
        names.extend(
            [&self.company, &self.exchange, &self.market_cap]
                .into_iter()
                .flatten()
                .map(String::as_str),
        );
        names.extend(self.excluded.iter().map(String::as_str));
        names
    }

    /// Resolve the schema against a header row.
    ///
    /// Fails with [`DataError::Schema`] when the ticker or sector column is
    /// absent. Optional columns that are absent resolve to `None`.
    pub fn resolve(&self, headers: &[String]) -> Result<ResolvedSchema> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let ticker = find(self.ticker.as_str());
        let sector = find(self.sector.as_str());

        let (Some(ticker), Some(sector)) = (ticker, sector) else {
            let missing = [(&self.ticker, ticker), (&self.sector, sector)]
                .into_iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name.clone())
                .collect();
            return Err(DataError::Schema { missing });
        };

        let metadata = self.metadata_names();
        let price_columns = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !metadata.contains(&h.trim()))
            .map(|(i, _)| i)
            .collect();

        Ok(ResolvedSchema {
            ticker,
            sector,
            company: self.company.as_deref().and_then(find),
            exchange: self.exchange.as_deref().and_then(find),
            market_cap: self.market_cap.as_deref().and_then(find),
            price_columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_default_schema() {
        let h = headers(&[
            "Ticker",
            "Company",
            "Sector",
            "Exchange",
            "Marketcap",
            "2024-01-02",
            "2024-01-03",
        ]);
        let resolved = ColumnSchema::default().resolve(&h).unwrap();

        assert_eq!(resolved.ticker, 0);
        assert_eq!(resolved.sector, 2);
        assert_eq!(resolved.company, Some(1));
        assert_eq!(resolved.exchange, Some(3));
        assert_eq!(resolved.market_cap, Some(4));
        assert_eq!(resolved.price_columns, vec![5, 6]);
    }

    #[test]
    fn test_metadata_position_does_not_matter() {
        // Metadata after the price columns must not be read as prices.
        let h = headers(&["2024-01-02", "Ticker", "2024-01-03", "Sector", "Marketcap"]);
        let resolved = ColumnSchema::default().resolve(&h).unwrap();

        assert_eq!(resolved.price_columns, vec![0, 2]);
        assert_eq!(resolved.company, None);
        assert_eq!(resolved.exchange, None);
    }

    #[test]
    fn test_missing_required_columns() {
        let h = headers(&["Symbol", "Company", "2024-01-02"]);
        let err = ColumnSchema::default().resolve(&h).unwrap_err();

        match err {
            DataError::Schema { missing } => {
                assert_eq!(missing, vec!["Ticker".to_string(), "Sector".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_excluded_columns_are_not_prices() {
        let schema = ColumnSchema {
            excluded: vec!["Notes".to_string()],
            ..Default::default()
        };
        let h = headers(&["Ticker", "Sector", "Notes", "2024-01-02"]);
        let resolved = schema.resolve(&h).unwrap();

        assert_eq!(resolved.price_columns, vec![3]);
    }
}
