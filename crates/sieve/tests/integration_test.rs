//! End-to-end pipeline tests over a synthetic wide dataset.

use approx::assert_relative_eq;
use sieve::data::{CsvTextSource, DataSource, RawTable};
use sieve::optimizer::{Infeasibility, Objective, OptimizerConfig, OptimizerError};
use sieve::output::{ExportFormat, Exporter, PerformanceExport, WeightsExport};
use sieve::{Pipeline, PipelineConfig, PipelineError, Universe, UniverseFilter};

const N_DATES: usize = 28;

struct Asset {
    ticker: &'static str,
    sector: &'static str,
    exchange: &'static str,
    cap: &'static str,
    drift: f64,
    amp: f64,
    phase: f64,
    gaps: &'static [usize],
}

const ASSETS: &[Asset] = &[
    Asset { ticker: "AAPL", sector: "Technology", exchange: "NASDAQ", cap: "3000000000000", drift: 0.0012, amp: 0.012, phase: 0.0, gaps: &[] },
    Asset { ticker: "MSFT", sector: "Technology", exchange: "NASDAQ", cap: "2800000000000", drift: 0.0010, amp: 0.010, phase: 1.1, gaps: &[7] },
    Asset { ticker: "NVDA", sector: "Technology", exchange: "NASDAQ", cap: "1200000000000", drift: 0.0020, amp: 0.025, phase: 2.3, gaps: &[] },
    Asset { ticker: "XOM", sector: "Energy", exchange: "NYSE", cap: "450000000000", drift: 0.0004, amp: 0.011, phase: 3.7, gaps: &[] },
    Asset { ticker: "CVX", sector: "Energy", exchange: "NYSE", cap: "300000000000", drift: 0.0003, amp: 0.013, phase: 0.6, gaps: &[0] },
    Asset { ticker: "JNJ", sector: "Health Care", exchange: "NYSE", cap: "380000000000", drift: 0.0002, amp: 0.006, phase: 4.4, gaps: &[] },
    Asset { ticker: "PFE", sector: "Health Care", exchange: "NYSE", cap: "160000000000", drift: -0.0001, amp: 0.009, phase: 5.2, gaps: &[] },
    Asset { ticker: "GAPS", sector: "Technology", exchange: "NASDAQ", cap: "50000000000", drift: 0.0015, amp: 0.015, phase: 1.9, gaps: &[3, 4, 5, 6, 9, 11] },
    Asset { ticker: "TINY", sector: "Energy", exchange: "NYSE", cap: "400000000", drift: 0.0030, amp: 0.030, phase: 2.8, gaps: &[] },
    Asset { ticker: "NEE", sector: "Utilities", exchange: "NYSE", cap: "140000000000", drift: 0.0001, amp: 0.005, phase: 3.3, gaps: &[] },
    Asset { ticker: "SPY", sector: "ETF", exchange: "NYSE", cap: "", drift: 0.0006, amp: 0.007, phase: 0.9, gaps: &[] },
];

fn prices(asset: &Asset) -> Vec<f64> {
    let mut price = 100.0;
    (0..N_DATES)
        .map(|t| {
            if t > 0 {
                price *= 1.0 + asset.drift + asset.amp * ((t as f64) * 0.9 + asset.phase).sin();
            }
            price
        })
        .collect()
}

fn dataset() -> String {
    let mut csv = String::from("Ticker,Company,Sector,Exchange,Marketcap");
    for day in 1..=N_DATES {
        csv.push_str(&format!(",2024-01-{day:02}"));
    }
    csv.push('\n');
    for asset in ASSETS {
        csv.push_str(&format!(
            "{},{} Inc,{},{},{}",
            asset.ticker, asset.ticker, asset.sector, asset.exchange, asset.cap
        ));
        for (t, p) in prices(asset).into_iter().enumerate() {
            if asset.gaps.contains(&t) {
                csv.push(',');
            } else {
                csv.push_str(&format!(",{p:.4}"));
            }
        }
        csv.push('\n');
    }
    csv
}

fn config() -> PipelineConfig {
    PipelineConfig {
        universe: UniverseFilter::new()
            .with_sectors(["Technology", "Energy", "Health Care"])
            .with_min_market_cap_billions(1.0),
        optimizer: OptimizerConfig {
            max_weight: 0.4,
            max_holdings: 5,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_screen_optimize_export_backtest() {
    let source = CsvTextSource::new("synthetic", dataset());
    let pipeline = Pipeline::new(config());
    let table = pipeline.load(&source).unwrap();

    let run = pipeline.optimize(&table).unwrap();

    // TINY fails the cap threshold, NEE the sector, SPY both; GAPS is dropped
    // for missing data.
    let candidates = run.screened.prices.tickers();
    assert_eq!(candidates, ["AAPL", "MSFT", "NVDA", "XOM", "CVX", "JNJ", "PFE"]);
    assert_eq!(run.screened.universe.size(), 8);
    // The MSFT and CVX gaps remove two dates for every candidate.
    assert_eq!(run.screened.prices.n_dates(), N_DATES - 2);
    assert!(run.screened.prices.values().iter().all(|p| p.is_finite()));

    let weights = &run.optimization.weights;
    assert_relative_eq!(weights.total(), 1.0, epsilon = 1e-6);
    assert!(weights.active_count() <= 5);
    for (ticker, w) in weights.entries() {
        assert!(*w <= 0.4 + 1e-9, "{ticker} weight {w}");
        assert!(*w >= 0.0);
        assert!(candidates.contains(ticker));
    }
    assert_eq!(run.optimization.objective, Objective::MaxSharpe);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portfolio.csv");
    run.weights_export()
        .export_to_file(&path, ExportFormat::Csv)
        .unwrap();
    let imported = WeightsExport::read_file(&path).unwrap();
    assert_eq!(imported.sectors().get("XOM").is_some(), weights.get("XOM").is_some());
    let reloaded = imported.to_weight_vector().unwrap();
    assert_eq!(&reloaded, weights);

    let backtest = pipeline.backtest(&table, &reloaded).unwrap();
    let series = &backtest.report.series;
    assert_eq!(series.len(), backtest.prices.n_dates());
    assert!(series.len() >= N_DATES - 2);
    assert_relative_eq!(series.portfolio()[0], 1.0);
    assert_relative_eq!(series.benchmark()[0], 1.0);
    assert_eq!(backtest.benchmark.ticker(), "SPY");
    assert!(backtest.report.alpha.is_finite());

    let first = series.dates()[0];
    let last = series.dates()[series.len() - 1];
    let spy = &backtest.benchmark;
    assert_relative_eq!(
        backtest.report.benchmark.total_return,
        spy.get(last).unwrap() / spy.get(first).unwrap() - 1.0,
        epsilon = 1e-12
    );

    let csv = PerformanceExport::new(&backtest.report)
        .export_to_string(ExportFormat::Csv)
        .unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Date,Portfolio,Benchmark"));
    assert_eq!(lines.next(), Some(format!("{first},1,1").as_str()));
    assert_eq!(csv.lines().count(), series.len() + 1);
}

#[test]
fn test_min_risk_prefers_low_volatility() {
    let pipeline = Pipeline::new(PipelineConfig {
        optimizer: OptimizerConfig {
            objective: Objective::MinRisk,
            max_weight: 0.4,
            max_holdings: 5,
            ..Default::default()
        },
        ..config()
    });
    let table = RawTable::from_csv_str(&dataset()).unwrap();
    let run = pipeline.optimize(&table).unwrap();

    let weights = &run.optimization.weights;
    assert_relative_eq!(weights.total(), 1.0, epsilon = 1e-6);
    assert!(weights.get("JNJ").unwrap_or(0.0) > weights.get("NVDA").unwrap_or(0.0));
}

#[test]
fn test_empty_universe() {
    let pipeline = Pipeline::new(PipelineConfig {
        universe: UniverseFilter::new().with_sectors(["Materials"]),
        ..config()
    });
    let source = CsvTextSource::new("synthetic", dataset());
    let err = pipeline.run(&source).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyUniverse { .. }));
}

#[test]
fn test_infeasible_constraints_are_reported() {
    let pipeline = Pipeline::new(PipelineConfig {
        optimizer: OptimizerConfig {
            max_weight: 0.2,
            max_holdings: 3,
            ..Default::default()
        },
        ..config()
    });
    let source = CsvTextSource::new("synthetic", dataset());
    let err = pipeline.run(&source).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Optimizer(OptimizerError::Infeasible(Infeasibility::CapTooLow { .. }))
    ));
}

#[test]
fn test_backtest_of_hand_written_weights() {
    let table = CsvTextSource::new("synthetic", dataset()).load().unwrap();
    let weights = WeightsExport::from_csv_str("Ticker,Weight\nNEE,0.5\nGAPS,0.5\n")
        .unwrap()
        .to_weight_vector()
        .unwrap();

    // GAPS exceeds the missing threshold, so it cannot be priced.
    let err = Pipeline::new(config()).backtest(&table, &weights).unwrap_err();
    assert!(err.to_string().contains("GAPS"));

    let weights = WeightsExport::from_csv_str("Ticker,Weight\nNEE,0.5\nXOM,0.5\n")
        .unwrap()
        .to_weight_vector()
        .unwrap();
    let run = Pipeline::new(config()).backtest(&table, &weights).unwrap();
    assert_eq!(run.sectors.get("NEE"), Some("Utilities"));
    assert_eq!(run.report.series.len(), N_DATES);
}
