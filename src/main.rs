//! Shelf-Crawler main entry point
//!
//! This is the command-line interface for the Shelf-Crawler category crawler.

use anyhow::Context;
use clap::Parser;
use shelf_crawler::config::{load_config_with_hash, Config};
use shelf_crawler::crawler::{run_crawl, CompiledSchema};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Shelf-Crawler: a category-tree product crawler
///
/// Shelf-Crawler walks a retail catalog from its category index down to
/// every paginated product listing and stores each product card it finds,
/// tagged with the category and sub-category it was listed under.
#[derive(Parser, Debug)]
#[command(name = "shelf-crawler")]
#[command(version)]
#[command(about = "A category-tree product crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the latest run from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_crawler=info,warn"),
            1 => EnvFilter::new("shelf_crawler=debug,info"),
            2 => EnvFilter::new("shelf_crawler=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let schema = CompiledSchema::compile(&config.schema).context("Site schema does not compile")?;

    println!("=== Shelf-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!(
        "  Concurrent sessions: {}",
        config.crawler.max_concurrent_sessions
    );
    println!("  Deduplicate URLs: {}", config.crawler.deduplicate);

    println!("\nGateway:");
    println!("  User agent: {}", config.gateway.user_agent);
    println!("  Timeout: {}s", config.gateway.timeout_secs);
    println!(
        "  Retries: {} (backoff {}ms)",
        config.gateway.max_retries, config.gateway.retry_backoff_ms
    );
    match &config.gateway.render_endpoint {
        Some(endpoint) => println!("  Render endpoint: {}", endpoint),
        None => println!("  Render endpoint: none (direct HTTP)"),
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nSite Schema (version {}):", schema.version);
    for (field, selector) in config.schema.selectors() {
        println!("  {:<22} {}", field, selector);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling at {}",
        config.crawler.start_url
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use shelf_crawler::output::{load_statistics, print_statistics};
    use shelf_crawler::sink::SqliteSink;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let sink = SqliteSink::new(Path::new(&config.output.database_path))
        .context("Failed to open database")?;

    match load_statistics(&sink)? {
        Some(stats) => print_statistics(&stats),
        None => println!("No crawl runs recorded yet"),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling from {} with {} sessions",
        config.crawler.start_url,
        config.crawler.max_concurrent_sessions
    );

    match run_crawl(config, config_hash).await {
        Ok(report) => {
            tracing::info!(
                "Crawl completed successfully: {} products stored",
                report.records_stored
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
