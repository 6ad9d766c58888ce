//! CSV and JSON export of optimized weights and backtest results.
//!
//! The weights table (`Ticker,Weight,Sector,Contribution`) is the artifact a
//! later run reads back for evaluation, so its column names and order are
//! fixed and [`WeightsExport`] can parse what it writes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sieve_data::{Allocation, DataError, SectorMap, WeightVector};
use sieve_risk::{MetricsRecord, PerformanceReport};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Column order of the exported weights table.
pub const WEIGHTS_HEADER: [&str; 4] = ["Ticker", "Weight", "Sector", "Contribution"];

/// Column order of the exported performance series.
pub const PERFORMANCE_HEADER: [&str; 3] = ["Date", "Portfolio", "Benchmark"];

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// DataFrame construction error.
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Imported weights are not a valid weight vector.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" | "pretty" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(format!(
                "unknown export format '{other}' (expected csv, json or pretty-json)"
            ))),
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

fn to_json<T: Serialize>(value: &T, format: ExportFormat) -> Result<String, ExportError> {
    Ok(match format {
        ExportFormat::PrettyJson => serde_json::to_string_pretty(value)?,
        _ => serde_json::to_string(value)?,
    })
}

/// One row of the weights table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRow {
    /// Ticker symbol.
    #[serde(rename = "Ticker")]
    pub ticker: String,

    /// Portfolio weight as a fraction.
    #[serde(rename = "Weight")]
    pub weight: f64,

    /// Sector label, empty when unknown.
    #[serde(rename = "Sector", default)]
    pub sector: Option<String>,

    /// Weight expressed as a percentage.
    #[serde(rename = "Contribution", default)]
    pub contribution: f64,
}

impl From<&Allocation> for WeightRow {
    fn from(a: &Allocation) -> Self {
        Self {
            ticker: a.ticker.clone(),
            weight: a.weight,
            sector: a.sector.clone(),
            contribution: a.contribution,
        }
    }
}

/// The optimized weights table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightsExport {
    /// Rows in portfolio order.
    pub rows: Vec<WeightRow>,
}

impl WeightsExport {
    /// Build the table from weights and the sector lookup.
    pub fn new(weights: &WeightVector, sectors: &SectorMap) -> Self {
        Self::from_allocations(&weights.allocations(sectors))
    }

    /// Build the table from allocation rows.
    pub fn from_allocations(allocations: &[Allocation]) -> Self {
        Self {
            rows: allocations.iter().map(WeightRow::from).collect(),
        }
    }

    /// Sum of the weights (close to 1.0 for optimizer output).
    pub fn total_weight(&self) -> f64 {
        self.rows.iter().map(|r| r.weight).sum()
    }

    /// Rebuild the weight vector.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate or empty tickers and non-finite weights.
    pub fn to_weight_vector(&self) -> Result<WeightVector, ExportError> {
        Ok(WeightVector::new(
            self.rows
                .iter()
                .map(|r| (r.ticker.clone(), r.weight))
                .collect(),
        )?)
    }

    /// Sector lookup carried by the table.
    pub fn sectors(&self) -> SectorMap {
        self.rows
            .iter()
            .filter_map(|r| r.sector.clone().map(|s| (r.ticker.clone(), s)))
            .collect()
    }

    /// Parse a weights CSV. `Ticker` and `Weight` columns are required.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidFormat`] when a required column is absent.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, ExportError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let missing: Vec<&str> = ["Ticker", "Weight"]
            .into_iter()
            .filter(|name| !headers.iter().any(|h| h == *name))
            .collect();
        if !missing.is_empty() {
            return Err(ExportError::InvalidFormat(format!(
                "weights table is missing columns {missing:?}; expected header {}",
                WEIGHTS_HEADER.join(",")
            )));
        }

        let rows = rdr
            .deserialize::<WeightRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    /// Parse weights CSV text.
    pub fn from_csv_str(text: &str) -> Result<Self, ExportError> {
        Self::from_csv_reader(text.as_bytes())
    }

    /// Parse a JSON array of weight rows.
    pub fn from_json_str(text: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a weights file, choosing the parser by extension (CSV by default).
    pub fn read_file(path: &Path) -> Result<Self, ExportError> {
        match ExportFormat::from_path(path) {
            Some(ExportFormat::Json | ExportFormat::PrettyJson) => {
                Self::from_json_str(&std::fs::read_to_string(path)?)
            }
            _ => Self::from_csv_reader(File::open(path)?),
        }
    }
}

impl Exporter for WeightsExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(WEIGHTS_HEADER)?;
                for row in &self.rows {
                    wtr.write_record([
                        row.ticker.clone(),
                        row.weight.to_string(),
                        row.sector.clone().unwrap_or_default(),
                        row.contribution.to_string(),
                    ])?;
                }
                finish_csv(wtr)
            }
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
        }
    }
}

/// One dated row of the performance series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    /// Observation date.
    #[serde(rename = "Date")]
    pub date: NaiveDate,

    /// Portfolio value, 1.0 on the first date.
    #[serde(rename = "Portfolio")]
    pub portfolio: f64,

    /// Benchmark value, 1.0 on the first date.
    #[serde(rename = "Benchmark")]
    pub benchmark: f64,
}

/// Metrics for both legs of a backtest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsExport {
    /// Portfolio metrics, including alpha.
    #[serde(rename = "Portfolio")]
    pub portfolio: MetricsRecord,

    /// Benchmark metrics.
    #[serde(rename = "Benchmark")]
    pub benchmark: MetricsRecord,
}

impl Exporter for MetricsExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(["Metric", "Portfolio", "Benchmark"])?;
                let rows = [
                    (
                        "Total Return (%)",
                        self.portfolio.total_return_pct,
                        self.benchmark.total_return_pct,
                    ),
                    (
                        "Sharpe Ratio",
                        self.portfolio.sharpe_ratio,
                        self.benchmark.sharpe_ratio,
                    ),
                    (
                        "Max Drawdown (%)",
                        self.portfolio.max_drawdown_pct,
                        self.benchmark.max_drawdown_pct,
                    ),
                ];
                for (name, portfolio, benchmark) in rows {
                    wtr.write_record([
                        name.to_string(),
                        portfolio.to_string(),
                        benchmark.to_string(),
                    ])?;
                }
                if let Some(alpha) = self.portfolio.alpha {
                    wtr.write_record([
                        "Alpha (vs Benchmark)".to_string(),
                        alpha.to_string(),
                        String::new(),
                    ])?;
                }
                finish_csv(wtr)
            }
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
        }
    }
}

/// Backtest output: the dated series plus both metrics records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceExport {
    /// Summary metrics.
    pub metrics: MetricsExport,

    /// Dated portfolio and benchmark values.
    pub series: Vec<PerformanceRow>,
}

impl PerformanceExport {
    /// Flatten a performance report.
    pub fn new(report: &PerformanceReport) -> Self {
        Self {
            metrics: MetricsExport {
                portfolio: report.portfolio_record(),
                benchmark: report.benchmark_record(),
            },
            series: report
                .series
                .rows()
                .map(|(date, portfolio, benchmark)| PerformanceRow {
                    date,
                    portfolio,
                    benchmark,
                })
                .collect(),
        }
    }
}

impl Exporter for PerformanceExport {
    /// CSV holds the series only; JSON holds series and metrics.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(PERFORMANCE_HEADER)?;
                for row in &self.series {
                    wtr.write_record([
                        row.date.to_string(),
                        row.portfolio.to_string(),
                        row.benchmark.to_string(),
                    ])?;
                }
                finish_csv(wtr)
            }
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> WeightsExport {
        let weights = WeightVector::new(vec![
            ("AAPL".to_string(), 0.4),
            ("XOM".to_string(), 0.35),
            ("ZZZ".to_string(), 0.25),
        ])
        .unwrap();
        let sectors: SectorMap = [
            ("AAPL".to_string(), "Technology".to_string()),
            ("XOM".to_string(), "Energy".to_string()),
        ]
        .into_iter()
        .collect();
        WeightsExport::new(&weights, &sectors)
    }

    #[test]
    fn test_weights_csv_header_and_rows() {
        let csv = sample().export_to_string(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Ticker,Weight,Sector,Contribution"));
        assert_eq!(lines.next(), Some("AAPL,0.4,Technology,40"));
        assert_eq!(lines.next(), Some("XOM,0.35,Energy,35"));
        assert_eq!(lines.next(), Some("ZZZ,0.25,,25"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_weights_csv_round_trip() {
        let export = sample();
        let csv = export.export_to_string(ExportFormat::Csv).unwrap();
        let parsed = WeightsExport::from_csv_str(&csv).unwrap();

        assert_eq!(parsed, export);
        assert_eq!(parsed.sectors().get("XOM"), Some("Energy"));
        assert_eq!(parsed.sectors().get("ZZZ"), None);
        assert_eq!(parsed.to_weight_vector().unwrap().get("AAPL"), Some(0.4));
    }

    #[test]
    fn test_weights_json_round_trip() {
        let export = sample();
        let json = export.export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(json.contains("\"Ticker\": \"AAPL\""));
        assert_eq!(WeightsExport::from_json_str(&json).unwrap(), export);
    }

    #[test]
    fn test_weights_csv_without_optional_columns() {
        let parsed = WeightsExport::from_csv_str("Ticker,Weight\nAAA,0.6\nBBB,0.4\n").unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].sector, None);
        assert!((parsed.total_weight() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weights_csv_missing_weight_column() {
        let err = WeightsExport::from_csv_str("Ticker,Sector\nAAA,Energy\n").unwrap_err();
        assert!(matches!(err, ExportError::InvalidFormat(_)));
    }

    #[test]
    fn test_duplicate_tickers_rejected_on_import() {
        let parsed = WeightsExport::from_csv_str("Ticker,Weight\nAAA,0.5\nAAA,0.5\n").unwrap();
        assert!(matches!(
            parsed.to_weight_vector(),
            Err(ExportError::Data(DataError::DuplicateTicker(_)))
        ));
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("JSON", ExportFormat::Json)]
    #[case("pretty-json", ExportFormat::PrettyJson)]
    fn test_format_from_str(#[case] input: &str, #[case] expected: ExportFormat) {
        assert_eq!(input.parse::<ExportFormat>().unwrap(), expected);
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
        assert_eq!(
            ExportFormat::from_path(Path::new("out/weights.JSON")),
            Some(ExportFormat::Json)
        );
        assert_eq!(ExportFormat::from_path(Path::new("weights")), None);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }
}
