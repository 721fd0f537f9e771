//! NewsFusion main entry point
//!
//! This is the command-line interface for the NewsFusion news crawler.

use anyhow::Context;
use clap::Parser;
use newsfusion::config::{load_config_with_hash, Config};
use newsfusion::crawler::{Coordinator, CrawlMode, CrawlRequest};
use newsfusion::output::{load_statistics, print_articles, print_run_report, print_statistics};
use newsfusion::search::search_articles;
use newsfusion::storage::{SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// NewsFusion: a polite news crawler
///
/// NewsFusion crawls configured news listings and a search-results feed,
/// extracts articles, and stores each unique article once.
#[derive(Parser, Debug)]
#[command(name = "newsfusion")]
#[command(version = "1.0.0")]
#[command(about = "A polite news crawler", long_about = None)]
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

    /// Keyword: a filter for listing sources, the query for the search feed
    #[arg(short, long)]
    keyword: Option<String>,

    /// Crawl only this source
    #[arg(long, conflicts_with = "search_feed")]
    source_id: Option<i64>,

    /// Crawl the configured search-results feed instead of listing sources
    #[arg(long)]
    search_feed: bool,

    /// Wait at most --max-wait seconds, then report the run status
    #[arg(long)]
    wait: bool,

    /// Upper bound for --wait, in seconds
    #[arg(long, default_value_t = 180, requires = "wait")]
    max_wait: u64,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "list_sources", "find"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "list_sources", "find"])]
    stats: bool,

    /// List configured sources and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "find"])]
    list_sources: bool,

    /// Search stored articles for a keyword and exit
    #[arg(long, value_name = "KEYWORD", conflicts_with_all = ["dry_run", "stats", "list_sources"])]
    find: Option<String>,

    /// Maximum number of articles printed by --find
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

impl Cli {
    fn crawl_request(&self) -> CrawlRequest {
        CrawlRequest {
            keyword: self.keyword.clone(),
            source_id: self.source_id,
            mode: if self.search_feed {
                CrawlMode::SearchFeed
            } else {
                CrawlMode::Sources
            },
            wait: None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.stats {
        handle_stats(&config)
    } else if cli.list_sources {
        handle_list_sources(config, config_hash)
    } else if let Some(keyword) = &cli.find {
        handle_find(&config, keyword, cli.limit)
    } else if cli.dry_run {
        handle_dry_run(config, config_hash, &cli)
    } else {
        handle_crawl(config, config_hash, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("newsfusion=info,warn"),
            1 => EnvFilter::new("newsfusion=debug,info"),
            2 => EnvFilter::new("newsfusion=trace,debug"),
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

fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    SqliteStorage::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: Config, config_hash: String, cli: &Cli) -> anyhow::Result<()> {
    println!("=== NewsFusion Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Download delay: {}ms", config.crawler.download_delay_ms);
    println!(
        "  Max pages per target: {}",
        config.crawler.max_pages_per_target
    );
    println!("  Run timeout: {}s", config.crawler.run_timeout_secs);
    println!("  Obey robots.txt: {}", config.crawler.obey_robots);
    println!(
        "  Autothrottle: {}",
        if config.crawler.autothrottle.enabled {
            "on"
        } else {
            "off"
        }
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nLayouts ({} configured):", config.layouts.len());
    for layout in &config.layouts {
        println!("  - {} ({})", layout.name, layout.domains.join(", "));
    }

    let request = cli.crawl_request();
    let coordinator = Coordinator::in_memory(config, config_hash)?;
    let targets = coordinator.planned_targets(&request)?;

    println!("\nTargets ({}):", targets.len());
    for target in &targets {
        println!("  - {}", target);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling {} targets", targets.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_database(config)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --list-sources mode: syncs and prints configured sources
fn handle_list_sources(config: Config, config_hash: String) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config, config_hash)?;
    let storage = coordinator.storage();
    let sources = storage
        .lock()
        .map_err(|_| anyhow::anyhow!("storage lock poisoned"))?
        .list_sources()?;

    println!("Sources ({}):", sources.len());
    for source in sources {
        println!(
            "  [{}] {} {}{}",
            source.id,
            source.name,
            source.url,
            if source.active { "" } else { " (inactive)" }
        );
    }

    Ok(())
}

/// Handles the --find mode: searches stored articles
fn handle_find(config: &Config, keyword: &str, limit: usize) -> anyhow::Result<()> {
    let storage = open_database(config)?;
    let articles = search_articles(&storage, keyword, limit)?;
    print_articles(&articles);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String, cli: &Cli) -> anyhow::Result<()> {
    tracing::info!(
        "Sources: {}, search feed: {}",
        config.sources.len(),
        if config.search.is_some() {
            "configured"
        } else {
            "none"
        }
    );

    let coordinator = Coordinator::new(config, config_hash)?;
    let handle = coordinator.start_crawl(cli.crawl_request()).await?;

    let limit = cli.wait.then(|| Duration::from_secs(cli.max_wait));
    let report = tokio::select! {
        report = handle.wait(limit) => report,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, stopping run {}", handle.id());
            handle.cancel();
            handle.wait(Some(Duration::from_secs(5))).await
        }
    };

    // The run cannot outlive the process
    let report = if report.status.is_terminal() {
        report
    } else {
        tracing::warn!("Run {} still running after --max-wait, cancelling", report.run_id);
        handle.cancel();
        handle.wait(Some(Duration::from_secs(5))).await
    };

    print_run_report(&report);
    Ok(())
}
