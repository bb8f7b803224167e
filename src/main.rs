// src/main.rs

//! newswatch CLI entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use clap::Parser;

use newswatch::config::Config;
use newswatch::crawl::{CrawlOrchestrator, RunRequest};
use newswatch::error::{AppError, Result};
use newswatch::output::{self, OutputFormat};

/// Keyword-driven crawler for Indonesian news sites.
#[derive(Parser, Debug)]
#[command(name = "newswatch", version, about = "Crawl news articles by keyword")]
struct Cli {
    /// Comma-separated search keywords
    #[arg(short, long, default_value = "ihsg")]
    keywords: String,

    /// Comma-separated site names, or "all"
    #[arg(short, long, default_value = "all")]
    sites: String,

    /// Ignore articles published before this date (YYYY-MM-DD);
    /// defaults to the first day of the current month
    #[arg(short = 'd', long = "start-date")]
    start_date: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Output file path; defaults to output/news-watch-<keywords>-<timestamp>
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wall-clock budget for the whole run, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Parse `YYYY-MM-DD`, defaulting to the first day of the current month.
fn resolve_start_date(raw: Option<&str>) -> Result<NaiveDateTime> {
    let date = match raw {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
            AppError::validation(format!("invalid start date '{raw}': {e}"))
        })?,
        None => {
            let today = Local::now().date_naive();
            NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
                .ok_or_else(|| AppError::validation("could not derive default start date"))?
        }
    };
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::validation("could not derive start-of-day instant"))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_or_default(path),
        None => Config::default(),
    };
    let config = Arc::new(config);

    let start_date = resolve_start_date(cli.start_date.as_deref())?;
    let request = RunRequest {
        keywords: split_list(&cli.keywords),
        sites: split_list(&cli.sites),
        start_date,
        wall_clock_budget: cli.timeout.map(Duration::from_secs),
    };

    log::info!(
        "Crawling for [{}] on [{}] since {}",
        cli.keywords,
        cli.sites,
        start_date.date()
    );

    let orchestrator = CrawlOrchestrator::new(Arc::clone(&config));
    let outcome = orchestrator.run(request).await?;

    for warning in &outcome.warnings {
        log::warn!("{warning}");
    }
    if outcome.is_failed_config() {
        log::error!("No crawl job could be scheduled; check the site selection");
        std::process::exit(1);
    }

    let path = cli
        .output
        .unwrap_or_else(|| output::default_output_path(&cli.keywords, cli.format));
    output::writer_for(cli.format)
        .write(&outcome.articles, &path)
        .await?;

    println!(
        "Collected {} articles across {} jobs ({} failed); written to {}",
        outcome.articles.len(),
        outcome.jobs_total,
        outcome.jobs_failed,
        path.display()
    );
    for report in &outcome.reports {
        log::info!(
            "{}/{}: {} pages, {} articles, {} skipped{}",
            report.site,
            report.keyword,
            report.pages_fetched,
            report.articles_emitted,
            report.articles_skipped,
            if report.stopped_by_threshold {
                " (reached date threshold)"
            } else {
                ""
            }
        );
    }

    Ok(())
}
