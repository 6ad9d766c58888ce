//! polars `DataFrame` views of pipeline outputs.

use crate::export::ExportError;
use chrono::NaiveDate;
use polars::prelude::*;
use sieve_data::{Allocation, PriceMatrix};
use sieve_risk::PerformanceSeries;

fn with_date_column(df: DataFrame) -> Result<DataFrame, ExportError> {
    Ok(df
        .lazy()
        .with_column(col("Date").cast(DataType::Date))
        .collect()?)
}

fn date_strings(dates: &[NaiveDate]) -> Vec<String> {
    dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect()
}

/// Wide price table: a `Date` column followed by one column per ticker.
pub fn prices_frame(prices: &PriceMatrix) -> Result<DataFrame, ExportError> {
    let mut columns: Vec<Column> = Vec::with_capacity(prices.n_tickers() + 1);
    columns.push(Series::new("Date".into(), date_strings(prices.dates())).into());
    for (j, ticker) in prices.tickers().iter().enumerate() {
        let values: Vec<f64> = prices.values().column(j).to_vec();
        columns.push(Series::new(ticker.as_str().into(), values).into());
    }
    with_date_column(DataFrame::new(columns)?)
}

/// Allocation table with the exported column names.
pub fn allocations_frame(allocations: &[Allocation]) -> Result<DataFrame, ExportError> {
    let tickers: Vec<String> = allocations.iter().map(|a| a.ticker.clone()).collect();
    let weights: Vec<f64> = allocations.iter().map(|a| a.weight).collect();
    let sectors: Vec<Option<String>> = allocations.iter().map(|a| a.sector.clone()).collect();
    let contributions: Vec<f64> = allocations.iter().map(|a| a.contribution).collect();

    Ok(DataFrame::new(vec![
        Series::new("Ticker".into(), tickers).into(),
        Series::new("Weight".into(), weights).into(),
        Series::new("Sector".into(), sectors).into(),
        Series::new("Contribution".into(), contributions).into(),
    ])?)
}

/// Dated portfolio and benchmark values.
pub fn performance_frame(series: &PerformanceSeries) -> Result<DataFrame, ExportError> {
    let df = DataFrame::new(vec![
        Series::new("Date".into(), date_strings(series.dates())).into(),
        Series::new("Portfolio".into(), series.portfolio().to_vec()).into(),
        Series::new("Benchmark".into(), series.benchmark().to_vec()).into(),
    ])?;
    with_date_column(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn prices() -> PriceMatrix {
        let dates = vec![
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        ];
        let tickers = vec!["AAA".to_string(), "BBB".to_string()];
        PriceMatrix::new(dates, tickers, array![[10.0, 20.0], [11.0, 19.0]]).unwrap()
    }

    #[test]
    fn test_prices_frame() {
        let df = prices_frame(&prices()).unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("Date").unwrap().dtype(), &DataType::Date);
        let bbb = df.column("BBB").unwrap().f64().unwrap();
        assert_eq!(bbb.get(1), Some(19.0));
    }

    #[test]
    fn test_allocations_frame() {
        let allocations = vec![
            Allocation {
                ticker: "AAA".to_string(),
                weight: 0.7,
                sector: Some("Energy".to_string()),
                contribution: 70.0,
            },
            Allocation {
                ticker: "BBB".to_string(),
                weight: 0.3,
                sector: None,
                contribution: 30.0,
            },
        ];
        let df = allocations_frame(&allocations).unwrap();
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["Ticker", "Weight", "Sector", "Contribution"]);
        assert_eq!(df.column("Sector").unwrap().null_count(), 1);
    }
}
