//! Pagesweep main entry point
//!
//! This is the command-line interface for the Pagesweep listing scraper.

use anyhow::Context;
use clap::Parser;
use pagesweep::config::{load_config_with_hash, parse_utc_offset, Config, SessionBackend};
use pagesweep::crawler::{Coordinator, PageRef};
use pagesweep::storage::{open_storage, ReportStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Pagesweep: a resilient paginated listing scraper
///
/// Pagesweep walks every page of a paginated listing in one browsing session,
/// extracts the listing cards on each page, and always prints a run report,
/// even when pages fail to load.
#[derive(Parser, Debug)]
#[command(name = "pagesweep")]
#[command(version)]
#[command(about = "A resilient paginated listing scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be scraped without opening a session
    #[arg(long, conflicts_with = "history")]
    dry_run: bool,

    /// List stored run reports and exit
    #[arg(long, conflicts_with = "dry_run")]
    history: bool,

    /// Print the report without storing it
    #[arg(long)]
    no_save: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.history {
        handle_history(&config)
    } else {
        handle_run(&config, &config_hash, !cli.no_save).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagesweep=info,warn"),
            1 => EnvFilter::new("pagesweep=debug,info"),
            2 => EnvFilter::new("pagesweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be scraped
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config)?;

    println!("=== Pagesweep Dry Run ===\n");

    println!("Target:");
    println!("  Page 1: {}", coordinator.page_url(PageRef::FIRST));
    if let Some(second) = PageRef::new(2) {
        println!("  Page 2: {}", coordinator.page_url(second));
    }
    println!("  Card selector: {}", config.target.card_selector);
    println!("  Row selector: {}", config.target.row_selector);
    println!("  Counter selector: {}", config.target.counter_selector);

    println!("\nSession:");
    match config.session.backend {
        SessionBackend::Http => println!("  Backend: http"),
        SessionBackend::Webdriver => {
            println!("  Backend: webdriver ({})", config.session.webdriver_url);
            println!(
                "  Browser args: {}",
                config.session.browser.to_args(&config.session.user_agent).join(" ")
            );
        }
    }
    println!("  Load timeout: {}s", config.session.load_timeout_secs);
    println!("  Settle delay: {}ms", config.session.settle_delay_ms);

    println!("\nReport:");
    println!("  Failures shown: {}", config.report.max_shown);
    println!("  Entry length: {} chars", config.report.max_entry_chars);
    println!("  Include records: {}", config.report.include_records);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Local offset: {}", config.output.local_utc_offset);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --history mode: lists stored reports
fn handle_history(config: &Config) -> anyhow::Result<()> {
    let offset = parse_utc_offset(&config.output.local_utc_offset)?;
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let reports = storage.list_reports()?;

    println!("Database: {}", config.output.database_path);
    println!("Stored reports: {}\n", reports.len());

    for stored in &reports {
        println!(
            "#{}  {}  ({})  pages: {}  records: {}  failures: {}",
            stored.id,
            stored.created_at_utc(),
            stored.created_at_local(offset),
            stored.report.page_count,
            stored.report.record_count,
            if stored.report.is_clean() { "none" } else { "yes" }
        );
    }

    Ok(())
}

/// Handles the main scrape operation
async fn handle_run(config: &Config, config_hash: &str, save: bool) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config)?;
    let report = coordinator.run().await;

    if save {
        let mut storage = open_storage(Path::new(&config.output.database_path))?;
        let id = storage
            .save_report(&report, config_hash)
            .context("Failed to store run report")?;
        tracing::info!("Report stored as #{} in {}", id, config.output.database_path);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
