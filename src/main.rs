//! Lotkeeper main entry point
//!
//! This is the command-line interface for the lotkeeper auction scraper.

use anyhow::Context;
use clap::Parser;
use lotkeeper::config::load_config_with_hash;
use lotkeeper::Scraper;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lotkeeper: an auction-listing scraper and normalizer
///
/// Lotkeeper refreshes the auction index, fetches item pages for auctions
/// that still need one, and stores normalized equip/material rows in
/// SQLite. Fetches are rate-limited and completed auctions are served
/// from the local page cache.
#[derive(Parser, Debug)]
#[command(name = "lotkeeper")]
#[command(version = "0.1.0")]
#[command(about = "An auction-listing scraper and normalizer", long_about = None)]
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

    /// Refresh the auction index without fetching item pages
    #[arg(long, conflicts_with = "stats")]
    refresh_only: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "refresh_only")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_scrape(&config, cli.refresh_only).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lotkeeper=info,warn"),
            1 => EnvFilter::new("lotkeeper=debug,info"),
            2 => EnvFilter::new("lotkeeper=trace,debug"),
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

/// Handles the --stats mode: shows record counts from the database
fn handle_stats(config: &lotkeeper::Config) -> anyhow::Result<()> {
    use lotkeeper::storage::Storage;
    use lotkeeper::SqliteStorage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = storage.stats()?;

    println!("Auctions:        {}", stats.auctions);
    println!("  pending fetch: {}", stats.pending_auctions);
    println!("Equip rows:      {}", stats.equips);
    println!("Material rows:   {}", stats.materials);
    println!("Parse failures:  {}", stats.failures);

    Ok(())
}

/// Handles the main scrape run
async fn handle_scrape(config: &lotkeeper::Config, refresh_only: bool) -> anyhow::Result<()> {
    let mut scraper = Scraper::new(config)?;

    let inserted = scraper.refresh_list().await?;
    tracing::info!("Listing refresh done ({} new)", inserted);

    if refresh_only {
        tracing::info!("Refresh-only run, skipping item pages");
        return Ok(());
    }

    match scraper.fetch_updates().await {
        Ok(fetched) => {
            tracing::info!("Scrape completed, {} auctions fetched", fetched);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            Err(e.into())
        }
    }
}
