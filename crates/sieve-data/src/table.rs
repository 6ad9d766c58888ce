//! Raw tabular dataset and the per-ticker universe rows derived from it.

use crate::clean::{parse_date_label, parse_number, parse_price};
use crate::error::{DataError, Result};
use crate::prices::PriceSeries;
use crate::schema::ColumnSchema;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::io::Read;

/// The opaque table handed over by a data source: a header row and string records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

impl RawTable {
    /// Create a table, padding or truncating records to the header width.
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let records = records
            .into_iter()
            .map(|mut r| {
                r.resize(width, String::new());
                r
            })
            .collect();
        Self { headers, records }
    }

    /// Parse CSV with a header row from any reader.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let records = rdr
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
            .collect::<std::result::Result<Vec<Vec<String>>, _>>()?;

        Ok(Self::new(headers, records))
    }

    /// Parse CSV text with a header row.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        Self::from_csv_reader(text.as_bytes())
    }

    /// Serialize back to CSV text.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(&self.headers)?;
        for record in &self.records {
            wtr.write_record(record)?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| DataError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| DataError::Cache(e.to_string()))
    }

    /// Column headers.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data records, each as wide as the header row.
    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    /// Number of data records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no data records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Interpret the table through a column schema.
    ///
    /// Validates that every row has a non-empty, unique ticker.
    pub fn universe(&self, schema: &ColumnSchema) -> Result<UniverseTable> {
        let resolved = schema.resolve(&self.headers)?;

        let price_labels: Vec<String> = resolved
            .price_columns
            .iter()
            .map(|&i| self.headers[i].trim().to_string())
            .collect();

        let optional = |record: &[String], idx: Option<usize>| {
            idx.map(|i| record[i].trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let rows = self
            .records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let record = record.as_slice();
                let ticker = record[resolved.ticker].trim().to_string();
                if ticker.is_empty() {
                    return Err(DataError::EmptyTicker { row });
                }
                Ok(RawUniverseRow {
                    ticker,
                    company: optional(record, resolved.company),
                    sector: record[resolved.sector].trim().to_string(),
                    exchange: optional(record, resolved.exchange),
                    market_cap: resolved
                        .market_cap
                        .and_then(|i| parse_number(&record[i])),
                    prices: resolved
                        .price_columns
                        .iter()
                        .map(|&i| record[i].clone())
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let absent = |idx: Option<usize>, name: Option<&str>, fallback: &str| {
            idx.is_none().then(|| name.unwrap_or(fallback).to_string())
        };
        let absent_columns = AbsentColumns {
            exchange: absent(resolved.exchange, schema.exchange.as_deref(), "Exchange"),
            market_cap: absent(resolved.market_cap, schema.market_cap.as_deref(), "Marketcap"),
        };

        Ok(UniverseTable::new(price_labels, rows)?.with_absent_columns(absent_columns))
    }
}

/// One ticker's metadata plus its raw, unparsed price cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawUniverseRow {
    /// Ticker symbol (non-empty).
    pub ticker: String,
    /// Company name.
    pub company: Option<String>,
    /// Sector label.
    pub sector: String,
    /// Listing exchange.
    pub exchange: Option<String>,
    /// Market capitalization in raw dollars.
    pub market_cap: Option<f64>,
    /// Raw price cells aligned with [`UniverseTable::price_labels`].
    pub prices: Vec<String>,
}

/// Optional metadata columns the source table did not carry.
///
/// Each field holds the expected column label when the column is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbsentColumns {
    /// Exchange column label
    pub exchange: Option<String>,
    /// Market capitalization column label
    pub market_cap: Option<String>,
}

/// A set of universe rows sharing one list of price column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct UniverseTable {
    price_labels: Vec<String>,
    rows: Vec<RawUniverseRow>,
    absent_columns: AbsentColumns,
}

impl UniverseTable {
    /// Create a universe table.
    ///
    /// Fails on duplicate tickers, empty tickers, or rows whose price cells do
    /// not line up with the labels.
    pub fn new(price_labels: Vec<String>, rows: Vec<RawUniverseRow>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.ticker.is_empty() {
                return Err(DataError::EmptyTicker { row: i });
            }
            if !seen.insert(row.ticker.as_str()) {
                return Err(DataError::DuplicateTicker(row.ticker.clone()));
            }
            if row.prices.len() != price_labels.len() {
                return Err(DataError::InvalidPrices(format!(
                    "{} has {} price cells for {} labels",
                    row.ticker,
                    row.prices.len(),
                    price_labels.len()
                )));
            }
        }
        Ok(Self {
            price_labels,
            rows,
            absent_columns: AbsentColumns::default(),
        })
    }

    /// Record which optional metadata columns the source lacked.
    pub fn with_absent_columns(mut self, absent_columns: AbsentColumns) -> Self {
        self.absent_columns = absent_columns;
        self
    }

    /// Optional metadata columns the source lacked.
    pub const fn absent_columns(&self) -> &AbsentColumns {
        &self.absent_columns
    }

    /// Price column labels, in source order.
    pub fn price_labels(&self) -> &[String] {
        &self.price_labels
    }

    /// Universe rows.
    pub fn rows(&self) -> &[RawUniverseRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Ticker symbols in row order.
    pub fn tickers(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.ticker.clone()).collect()
    }

    /// Look up a row by ticker.
    pub fn row(&self, ticker: &str) -> Option<&RawUniverseRow> {
        self.rows.iter().find(|r| r.ticker == ticker)
    }

    /// Keep only the rows matching a predicate, preserving order and labels.
    pub fn retain_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&RawUniverseRow) -> bool,
    {
        Self {
            price_labels: self.price_labels.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
            absent_columns: self.absent_columns.clone(),
        }
    }

    /// Parseable date labels as `(date, label index)`, sorted by date with
    /// duplicate dates resolved to the first column that carries them.
    pub fn date_columns(&self) -> Vec<(NaiveDate, usize)> {
        let mut dated: Vec<(NaiveDate, usize)> = self
            .price_labels
            .iter()
            .enumerate()
            .filter_map(|(i, label)| parse_date_label(label).map(|d| (d, i)))
            .collect();
        dated.sort_by_key(|(d, _)| *d);
        dated.dedup_by_key(|(d, _)| *d);
        dated
    }

    /// Extract one ticker's price history, dropping missing observations.
    ///
    /// Used for the benchmark, which lives in the same dataset as the universe.
    pub fn price_series(&self, ticker: &str) -> Result<PriceSeries> {
        let row = self
            .row(ticker)
            .ok_or_else(|| DataError::UnknownTicker(ticker.to_string()))?;

        let (dates, values): (Vec<NaiveDate>, Vec<f64>) = self
            .date_columns()
            .into_iter()
            .filter_map(|(date, i)| parse_price(&row.prices[i]).map(|p| (date, p)))
            .unzip();

        PriceSeries::new(ticker, dates, values)
    }
}
