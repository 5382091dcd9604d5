//! Food-Event-Harvester main entry point
//!
//! This is the command-line interface for the Food-Event-Harvester downloader.

use anyhow::Context;
use clap::Parser;
use food_event_harvester::config::{compute_config_hash, load_effective_config, Config};
use food_event_harvester::output::print_summary;
use food_event_harvester::{harvest, plan};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Food-Event-Harvester: a courteous bulk downloader
///
/// Splits a date range into monthly buckets, follows each bucket's
/// pagination links, and writes every page to disk as returned by the API.
/// Settings come from an optional TOML file, overridden by environment
/// variables (a `.env` file in the working directory is loaded first).
#[derive(Parser, Debug)]
#[command(name = "food-event-harvester")]
#[command(version)]
#[command(about = "A courteous bulk downloader for date-partitioned APIs", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the bucket plan without downloading
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // .env is optional
    dotenvy::dotenv().ok();

    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", fatal_line(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_effective_config(cli.config.as_deref(), |name| std::env::var(name).ok())
        .context("failed to load configuration")?;

    match &cli.config {
        Some(path) => tracing::info!(
            "Configuration loaded from {} (hash: {})",
            path.display(),
            compute_config_hash(&config)
        ),
        None => tracing::info!(
            "Using default configuration (hash: {})",
            compute_config_hash(&config)
        ),
    }

    if config.api.api_key.is_none() {
        tracing::warn!("No API key configured; requests will be subject to anonymous rate limits");
    }

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    let summary = harvest(&config).await?;
    if !cli.quiet {
        print_summary(&summary);
    }
    tracing::info!("Harvest completed successfully");

    Ok(())
}

/// Renders an error chain as the one diagnostic line of a failed run
fn fatal_line(error: &anyhow::Error) -> String {
    format!("fatal: {:#}", error)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("food_event_harvester=info,warn"),
            1 => EnvFilter::new("food_event_harvester=debug,info"),
            2 => EnvFilter::new("food_event_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and prints the bucket plan
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let buckets = plan(config)?;

    println!("=== Food-Event-Harvester Dry Run ===\n");

    println!("Harvest:");
    println!(
        "  Range: {} .. {}",
        config.harvest.start_date, config.harvest.end_date
    );
    println!("  Concurrency: {}", config.harvest.concurrency);
    println!("  Page size: {}", config.harvest.page_size);
    println!("  Pacing: {}ms", config.harvest.pacing_ms);

    println!("\nAPI:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Search field: {}", config.api.search_field);
    println!("  User agent: {}", config.api.user_agent);
    println!(
        "  API key: {}",
        if config.api.api_key.is_some() {
            "set"
        } else {
            "not set"
        }
    );

    println!("\nOutput:");
    println!("  Data dir: {}", config.output.data_dir);

    println!("\nBuckets ({}):", buckets.len());
    for bucket in &buckets {
        println!("  - {}", bucket);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}
