//! Reel-Harvest main entry point
//!
//! This is the command-line interface for the Reel-Harvest catalog harvester.

use clap::Parser;
use reel_harvest::config::{load_config_with_hash, Config};
use reel_harvest::crawler::{crawl, CrawlRequest, ResumeMode};
use reel_harvest::output::{load_statistics, print_run_summary, print_statistics};
use reel_harvest::storage::open_storage;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Reel-Harvest: a paginated catalog harvester
///
/// Reel-Harvest walks a page-numbered listing, collects every item it links
/// to, enriches each item from the site's metadata and vote endpoints and
/// stores the records in SQLite. Press Ctrl-C to stop; pending items are
/// saved and picked up by the next run.
#[derive(Parser, Debug)]
#[command(name = "reel-harvest")]
#[command(version)]
#[command(about = "A paginated catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Listing URL to start from (overrides crawl.start-url)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Maximum number of items to harvest, 0 for all (overrides crawl.limit)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume from a pending queue snapshot (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Discard any pending queue snapshot and start from the listing
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["url", "limit", "fresh", "resume"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config, config_hash) = load_config_with_hash(&cli.config)?;

    // crawler.debug is the config-file equivalent of -v
    let verbose = if config.crawler.debug {
        cli.verbose.max(1)
    } else {
        cli.verbose
    };
    setup_logging(verbose, cli.quiet);
    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    if cli.stats {
        handle_stats(&config)?;
    } else {
        let mode = if cli.fresh {
            ResumeMode::Fresh
        } else {
            ResumeMode::Resume
        };
        handle_harvest(config, &config_hash, cli.url, cli.limit, mode).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reel_harvest=info,warn"),
            1 => EnvFilter::new("reel_harvest=debug,info"),
            2 => EnvFilter::new("reel_harvest=trace,debug"),
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

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: Config,
    config_hash: &str,
    url: Option<String>,
    limit: Option<usize>,
    mode: ResumeMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = CrawlRequest {
        start_url: url,
        limit: limit.unwrap_or(config.crawl.limit),
        resume: mode,
    };

    match request.start_url.as_deref().or(config.crawl.start_url.as_deref()) {
        Some(start_url) => tracing::info!(
            "Harvesting from {} (limit: {}, workers: {})",
            start_url,
            request.limit,
            config.crawler.worker_count
        ),
        None => tracing::info!("No start URL given; only a pending snapshot can be resumed"),
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received; finishing in-flight items");
                cancel.cancel();
            }
        });
    }

    match crawl(config, config_hash, request, cancel).await {
        Ok(summary) => {
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
