//! Plain-text and Markdown reports of an optimization and its backtest.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sieve_data::{Allocation, SectorMap};
use sieve_optimizer::OptimizationResult;
use sieve_risk::{MetricsRecord, PerformanceReport};
use std::collections::BTreeMap;
use thiserror::Error;

const WIDTH: usize = 72;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Headline numbers of an optimization, annualized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationSummary {
    /// Objective name.
    pub objective: String,
    /// Number of held assets.
    pub holdings: usize,
    /// Expected annual return.
    pub annual_return: f64,
    /// Annual volatility.
    pub annual_volatility: f64,
    /// Annualized Sharpe ratio.
    pub sharpe: f64,
    /// Whether the solver met its tolerance.
    pub converged: bool,
}

impl OptimizationSummary {
    /// Summarize an optimizer result sampled `periods_per_year` times a year.
    pub fn new(result: &OptimizationResult, periods_per_year: f64) -> Self {
        Self {
            objective: result.objective.to_string(),
            holdings: result.weights.active_count(),
            annual_return: result.annualized_return(periods_per_year),
            annual_volatility: result.annualized_volatility(periods_per_year),
            sharpe: result.sharpe * periods_per_year.sqrt(),
            converged: result.converged,
        }
    }
}

/// A rendered-on-demand report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Report title.
    pub title: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Allocation rows.
    pub allocations: Vec<Allocation>,

    /// Weight per sector.
    pub sectors: BTreeMap<String, f64>,

    /// Optimizer summary, when the report covers an optimization.
    pub optimization: Option<OptimizationSummary>,

    /// Portfolio and benchmark metrics, when the report covers a backtest.
    pub performance: Option<(MetricsRecord, MetricsRecord)>,
}

impl Report {
    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render as a fixed-width text table.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\n{}\n", self.title));
        output.push_str(&format!(
            "Generated: {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M UTC")
        ));
        output.push_str(&"=".repeat(WIDTH));
        output.push('\n');

        if let Some(summary) = &self.optimization {
            output.push_str(&format!("Objective: {}\n", summary.objective));
            output.push_str(&format!("Holdings: {}\n", summary.holdings));
            output.push_str(&format!(
                "Expected Return: {:.2}%  Volatility: {:.2}%  Sharpe: {:.3}\n",
                summary.annual_return * 100.0,
                summary.annual_volatility * 100.0,
                summary.sharpe
            ));
            if !summary.converged {
                output.push_str("Note: solver stopped at its iteration limit\n");
            }
            output.push_str(&"-".repeat(WIDTH));
            output.push('\n');
        }

        if !self.allocations.is_empty() {
            output.push_str(&format!(
                "{:<10} {:>10} {:<28} {:>12}\n",
                "Ticker", "Weight", "Sector", "Contribution"
            ));
            output.push_str(&"-".repeat(WIDTH));
            output.push('\n');
            for a in &self.allocations {
                output.push_str(&format!(
                    "{:<10} {:>10.4} {:<28} {:>11.2}%\n",
                    a.ticker,
                    a.weight,
                    a.sector.as_deref().unwrap_or("-"),
                    a.contribution
                ));
            }
            output.push_str(&"-".repeat(WIDTH));
            output.push('\n');

            for (sector, weight) in &self.sectors {
                output.push_str(&format!("{:<39} {:>11.2}%\n", sector, weight * 100.0));
            }
            output.push_str(&"=".repeat(WIDTH));
            output.push('\n');
        }

        if let Some((portfolio, benchmark)) = &self.performance {
            output.push_str(&format!(
                "{:<24} {:>14} {:>14}\n",
                "Metric", "Portfolio", "Benchmark"
            ));
            output.push_str(&"-".repeat(WIDTH));
            output.push('\n');
            for (name, p, b) in metric_rows(portfolio, benchmark) {
                output.push_str(&format!("{name:<24} {p:>14} {b:>14}\n"));
            }
            if let Some(alpha) = portfolio.alpha {
                output.push_str(&format!("{:<24} {:>14.4}\n", "Alpha (vs Benchmark)", alpha));
            }
            output.push_str(&"=".repeat(WIDTH));
            output.push('\n');
        }

        output
    }

    /// Render as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", self.title));

        if let Some(summary) = &self.optimization {
            output.push_str(&format!("- **Objective:** {}\n", summary.objective));
            output.push_str(&format!("- **Holdings:** {}\n", summary.holdings));
            output.push_str(&format!(
                "- **Expected Return:** {:.2}%\n",
                summary.annual_return * 100.0
            ));
            output.push_str(&format!(
                "- **Volatility:** {:.2}%\n",
                summary.annual_volatility * 100.0
            ));
            output.push_str(&format!("- **Sharpe Ratio:** {:.3}\n\n", summary.sharpe));
        }

        if !self.allocations.is_empty() {
            output.push_str("## Allocations\n\n");
            output.push_str("| Ticker | Weight | Sector | Contribution |\n");
            output.push_str("|--------|--------|--------|--------------|\n");
            for a in &self.allocations {
                output.push_str(&format!(
                    "| {} | {:.4} | {} | {:.2}% |\n",
                    a.ticker,
                    a.weight,
                    a.sector.as_deref().unwrap_or("-"),
                    a.contribution
                ));
            }
            output.push('\n');

            output.push_str("## Sectors\n\n");
            output.push_str("| Sector | Weight |\n");
            output.push_str("|--------|--------|\n");
            for (sector, weight) in &self.sectors {
                output.push_str(&format!("| {} | {:.2}% |\n", sector, weight * 100.0));
            }
            output.push('\n');
        }

        if let Some((portfolio, benchmark)) = &self.performance {
            output.push_str("## Performance\n\n");
            output.push_str("| Metric | Portfolio | Benchmark |\n");
            output.push_str("|--------|-----------|-----------|\n");
            for (name, p, b) in metric_rows(portfolio, benchmark) {
                output.push_str(&format!("| {name} | {p} | {b} |\n"));
            }
            if let Some(alpha) = portfolio.alpha {
                output.push_str(&format!("| Alpha (vs Benchmark) | {alpha:.4} | |\n"));
            }
            output.push('\n');
        }

        output
    }
}

fn format_metric(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:.decimals$}")
    }
}

fn metric_rows(
    portfolio: &MetricsRecord,
    benchmark: &MetricsRecord,
) -> [(&'static str, String, String); 3] {
    [
        (
            "Total Return (%)",
            format_metric(portfolio.total_return_pct, 2),
            format_metric(benchmark.total_return_pct, 2),
        ),
        (
            "Sharpe Ratio",
            format_metric(portfolio.sharpe_ratio, 3),
            format_metric(benchmark.sharpe_ratio, 3),
        ),
        (
            "Max Drawdown (%)",
            format_metric(portfolio.max_drawdown_pct, 2),
            format_metric(benchmark.max_drawdown_pct, 2),
        ),
    ]
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    title: Option<String>,
    allocations: Vec<Allocation>,
    sectors: BTreeMap<String, f64>,
    optimization: Option<OptimizationSummary>,
    performance: Option<(MetricsRecord, MetricsRecord)>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add the optimizer output and its sector attribution.
    pub fn optimization(
        mut self,
        result: &OptimizationResult,
        sectors: &SectorMap,
        periods_per_year: f64,
    ) -> Self {
        self.allocations = result.allocations(sectors);
        self.sectors = result.weights.sector_totals(sectors);
        self.optimization = Some(OptimizationSummary::new(result, periods_per_year));
        self
    }

    /// Set allocation rows directly, e.g. from an imported weights table.
    pub fn allocations(mut self, allocations: Vec<Allocation>) -> Self {
        let mut sectors = BTreeMap::new();
        for a in &allocations {
            let sector = a.sector.clone().unwrap_or_else(|| "Unknown".to_string());
            *sectors.entry(sector).or_insert(0.0) += a.weight;
        }
        self.allocations = allocations;
        self.sectors = sectors;
        self
    }

    /// Add backtest metrics.
    pub fn performance(mut self, report: &PerformanceReport) -> Self {
        self.performance = Some((report.portfolio_record(), report.benchmark_record()));
        self
    }

    /// Build the report.
    pub fn build(self) -> Report {
        Report {
            title: self
                .title
                .unwrap_or_else(|| "Portfolio Report".to_string()),
            timestamp: Utc::now(),
            allocations: self.allocations,
            sectors: self.sectors,
            optimization: self.optimization,
            performance: self.performance,
        }
    }
}
