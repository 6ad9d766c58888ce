//! Sieve CLI binary.
//!
//! Screens a wide universe CSV, builds a constrained portfolio, and backtests
//! weights against a benchmark from the same dataset.

mod cache_manager;

use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use sieve::data::{CsvFileSource, DataSource, HttpCsvSource, StoredSource};
use sieve::optimizer::Objective;
use sieve::output::{
    ExportFormat, Exporter, PerformanceExport, Report, ReportBuilder, WeightsExport,
};
use sieve::risk::Rebalancing;
use sieve::{Pipeline, PipelineConfig, available_exchanges, available_sectors};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sieve")]
#[command(about = "Sieve: equity screening and constrained portfolio construction", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter and clean the universe, then list the candidates
    Screen {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// List the sectors and exchanges present in the dataset instead
        #[arg(long)]
        list_values: bool,

        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Screen, estimate risk and optimize portfolio weights
    Optimize {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        optimizer: OptimizerArgs,

        /// Write the weights table here
        #[arg(long)]
        out: Option<PathBuf>,

        /// Weights file format (csv, json or pretty-json); guessed from --out
        #[arg(long, value_parser = parse_format)]
        format: Option<ExportFormat>,

        /// Report printed to stdout (text, markdown or json)
        #[arg(long, default_value = "text")]
        report: String,
    },

    /// Evaluate a weights file against the benchmark
    Backtest {
        #[command(flatten)]
        source: SourceArgs,

        /// Weights file written by `optimize` (CSV or JSON)
        #[arg(long)]
        weights: PathBuf,

        /// Benchmark ticker, looked up in the same dataset
        #[arg(long)]
        benchmark: Option<String>,

        /// Hold the initial weights instead of rebalancing every period
        #[arg(long)]
        buy_and_hold: bool,

        /// Drop tickers missing at least this fraction of prices
        #[arg(long)]
        missing_threshold: Option<f64>,

        /// Write the performance series (CSV) or series and metrics (JSON) here
        #[arg(long)]
        out: Option<PathBuf>,

        /// Performance file format (csv, json or pretty-json); guessed from --out
        #[arg(long, value_parser = parse_format)]
        format: Option<ExportFormat>,

        /// Report printed to stdout (text, markdown or json)
        #[arg(long, default_value = "text")]
        report: String,
    },

    /// Inspect or clear the persistent dataset store
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List stored datasets
    List,
    /// Print the store location
    Path,
    /// Remove one stored dataset by source identity
    Remove {
        /// Source identity (URL) as shown by `cache list`
        id: String,
    },
    /// Remove every stored dataset
    Clear,
}

#[derive(Args)]
struct SourceArgs {
    /// Universe CSV: a local path or an http(s) URL
    #[arg(long)]
    data: String,

    /// JSON pipeline configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable caching (always fetch remote data)
    #[arg(long)]
    no_cache: bool,

    /// Force refresh of stored remote data
    #[arg(long)]
    refresh: bool,

    /// Refetch stored remote data older than this many hours
    #[arg(long)]
    max_age_hours: Option<i64>,
}

#[derive(Args)]
struct FilterArgs {
    /// Keep only this sector (repeatable)
    #[arg(long = "sector")]
    sectors: Vec<String>,

    /// Keep only this exchange (repeatable)
    #[arg(long = "exchange")]
    exchanges: Vec<String>,

    /// Minimum market capitalization in billions of dollars
    #[arg(long)]
    min_market_cap: Option<f64>,

    /// Drop tickers missing at least this fraction of prices
    #[arg(long)]
    missing_threshold: Option<f64>,
}

#[derive(Args)]
struct OptimizerArgs {
    /// Objective (max-sharpe, min-risk or utility)
    #[arg(long)]
    objective: Option<Objective>,

    /// Maximum weight of any holding
    #[arg(long)]
    max_weight: Option<f64>,

    /// Maximum number of holdings
    #[arg(long)]
    max_holdings: Option<usize>,

    /// Minimum weight of any holding
    #[arg(long)]
    weight_floor: Option<f64>,

    /// Annual risk-free rate
    #[arg(long)]
    risk_free_rate: Option<f64>,

    /// Risk aversion for the utility objective
    #[arg(long)]
    risk_aversion: Option<f64>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Screen {
            source,
            filter,
            list_values,
            format,
        } => {
            let mut config = load_config(source.config.as_deref())?;
            filter.apply(&mut config);
            screen(&source, config, list_values, &format)?;
        }
        Commands::Optimize {
            source,
            filter,
            optimizer,
            out,
            format,
            report,
        } => {
            let mut config = load_config(source.config.as_deref())?;
            filter.apply(&mut config);
            optimizer.apply(&mut config);
            optimize(&source, config, out.as_deref(), format, &report)?;
        }
        Commands::Backtest {
            source,
            weights,
            benchmark,
            buy_and_hold,
            missing_threshold,
            out,
            format,
            report,
        } => {
            let mut config = load_config(source.config.as_deref())?;
            if let Some(b) = benchmark {
                config.benchmark = b.to_uppercase();
            }
            if buy_and_hold {
                config.performance.rebalancing = Rebalancing::BuyAndHold;
            }
            if let Some(t) = missing_threshold {
                config.normalize.max_missing_fraction = t;
            }
            backtest(&source, config, &weights, out.as_deref(), format, &report)?;
        }
        Commands::Cache { action } => cache(action)?,
    }

    Ok(())
}

impl FilterArgs {
    fn apply(self, config: &mut PipelineConfig) {
        if !self.sectors.is_empty() {
            config.universe.sectors = self.sectors;
        }
        if !self.exchanges.is_empty() {
            config.universe.exchanges = self.exchanges;
        }
        if let Some(cap) = self.min_market_cap {
            config.universe.min_market_cap_billions = Some(cap);
        }
        if let Some(t) = self.missing_threshold {
            config.normalize.max_missing_fraction = t;
        }
    }
}

impl OptimizerArgs {
    fn apply(self, config: &mut PipelineConfig) {
        let opt = &mut config.optimizer;
        if let Some(o) = self.objective {
            opt.objective = o;
        }
        if let Some(w) = self.max_weight {
            opt.max_weight = w;
        }
        if let Some(n) = self.max_holdings {
            opt.max_holdings = n;
        }
        if let Some(f) = self.weight_floor {
            opt.weight_floor = f;
        }
        if let Some(r) = self.risk_free_rate {
            opt.risk_free_rate = r;
        }
        if let Some(a) = self.risk_aversion {
            opt.risk_aversion = a;
        }
    }
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse().map_err(|e: sieve::output::ExportError| e.to_string())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => {
            debug!(path = %p.display(), "Loading configuration");
            PipelineConfig::from_json_file(p)?
        }
        None => PipelineConfig::default(),
    };
    Ok(config)
}

/// Build the data source for `--data`.
///
/// Remote sources read through the persistent store unless `--no-cache` is
/// given; local files are always read directly.
fn open_source(args: &SourceArgs) -> Result<Box<dyn DataSource>, Box<dyn std::error::Error>> {
    let is_remote = args.data.starts_with("http://") || args.data.starts_with("https://");
    if !is_remote {
        return Ok(Box::new(CsvFileSource::new(&args.data)));
    }

    let http: Box<dyn DataSource> = Box::new(HttpCsvSource::new(&args.data));
    if args.no_cache {
        return Ok(http);
    }

    let store = cache_manager::open_store()?;
    let max_age = args.max_age_hours.map(Duration::hours);
    Ok(Box::new(
        StoredSource::new(http, store, max_age).force_refresh(args.refresh),
    ))
}

fn screen(
    args: &SourceArgs,
    config: PipelineConfig,
    list_values: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let source = open_source(args)?;
    let pipeline = Pipeline::new(config);
    let table = pipeline.load(source.as_ref())?;

    if list_values {
        let universe = pipeline.universe(&table)?;
        let sectors = available_sectors(&universe);
        let exchanges = available_exchanges(&universe);
        if format == "json" {
            let out = json!({ "sectors": sectors, "exchanges": exchanges });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("Sectors:");
            for s in &sectors {
                println!("  {}", s);
            }
            println!("\nExchanges:");
            for e in &exchanges {
                println!("  {}", e);
            }
        }
        return Ok(());
    }

    let screened = pipeline.screen(&table)?;
    let prices = &screened.prices;
    let dates = prices.dates();

    if format == "json" {
        let tickers: Vec<_> = prices
            .tickers()
            .iter()
            .map(|t| json!({ "ticker": t, "sector": screened.sectors.get(t) }))
            .collect();
        let out = json!({
            "filter": pipeline.config().universe.to_string(),
            "matched": screened.universe.len(),
            "kept": prices.n_tickers(),
            "dates": prices.n_dates(),
            "start": dates.first(),
            "end": dates.last(),
            "tickers": tickers,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Universe Screen");
    println!("===============\n");
    println!("Filter:   {}", pipeline.config().universe);
    println!("Matched:  {} tickers", screened.universe.len());
    println!(
        "Kept:     {} tickers after the missing-data policy (threshold {:.0}%)",
        prices.n_tickers(),
        pipeline.config().normalize.max_missing_fraction * 100.0
    );
    if let (Some(start), Some(end)) = (dates.first(), dates.last()) {
        println!("History:  {} dates, {} to {}", prices.n_dates(), start, end);
    }
    println!();
    for ticker in prices.tickers() {
        println!(
            "  {:<10} {}",
            ticker,
            screened.sectors.get(ticker).unwrap_or("-")
        );
    }

    Ok(())
}

fn optimize(
    args: &SourceArgs,
    config: PipelineConfig,
    out: Option<&Path>,
    format: Option<ExportFormat>,
    report: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let source = open_source(args)?;
    let periods_per_year = config.optimizer.periods_per_year;
    let pipeline = Pipeline::new(config);
    let run = pipeline.run(source.as_ref())?;

    if let Some(path) = out {
        let format = format.or_else(|| ExportFormat::from_path(path)).unwrap_or_default();
        run.weights_export().export_to_file(path, format)?;
        info!(path = %path.display(), format = format.extension(), "Wrote weights");
    }

    let rendered = ReportBuilder::new()
        .title("Optimized Portfolio")
        .optimization(&run.optimization, &run.screened.sectors, periods_per_year)
        .build();
    print_report(&rendered, report)
}

fn backtest(
    args: &SourceArgs,
    config: PipelineConfig,
    weights_path: &Path,
    out: Option<&Path>,
    format: Option<ExportFormat>,
    report: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let imported = WeightsExport::read_file(weights_path)?;
    let weights = imported.to_weight_vector()?;
    let total = weights.total();
    if (total - 1.0).abs() > 1e-6 {
        tracing::warn!(total, "Weights do not sum to 1; evaluating them as given");
    }

    let source = open_source(args)?;
    let pipeline = Pipeline::new(config);
    let table = pipeline.load(source.as_ref())?;
    let run = pipeline.backtest(&table, &weights)?;

    if let Some(path) = out {
        let format = format.or_else(|| ExportFormat::from_path(path)).unwrap_or_default();
        PerformanceExport::new(&run.report).export_to_file(path, format)?;
        info!(path = %path.display(), "Wrote performance");
    }

    let mut allocations = weights.allocations(&run.sectors);
    let imported_sectors = imported.sectors();
    for a in &mut allocations {
        if a.sector.is_none() {
            a.sector = imported_sectors.get(&a.ticker).map(str::to_string);
        }
    }

    let rendered = ReportBuilder::new()
        .title(format!("Backtest vs {}", pipeline.config().benchmark))
        .allocations(allocations)
        .performance(&run.report)
        .build();
    print_report(&rendered, report)
}

fn print_report(report: &Report, style: &str) -> Result<(), Box<dyn std::error::Error>> {
    match style {
        "json" => println!("{}", report.to_json()?),
        "markdown" | "md" => println!("{}", report.to_markdown()),
        "text" => println!("{}", report.to_ascii_table()),
        other => return Err(format!("unknown report style '{}'", other).into()),
    }
    Ok(())
}

fn cache(action: CacheAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CacheAction::Path => println!("{}", cache_manager::cache_path().display()),
        CacheAction::List => {
            let store = cache_manager::open_store()?;
            let entries = store.list()?;
            if entries.is_empty() {
                println!("No stored datasets");
            }
            for (id, rows, fetched_at) in entries {
                println!("{:<60} {:>6} rows  {}", id, rows, fetched_at.to_rfc3339());
            }
        }
        CacheAction::Remove { id } => {
            let store = cache_manager::open_store()?;
            if store.remove(&id)? {
                println!("Removed {}", id);
            } else {
                return Err(format!("no stored dataset for '{}'", id).into());
            }
        }
        CacheAction::Clear => {
            let n = cache_manager::open_store()?.clear()?;
            println!("Removed {} stored dataset(s)", n);
        }
    }
    Ok(())
}
