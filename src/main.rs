//! Sumi-Trawl main entry point
//!
//! This is the command-line interface for the Sumi-Trawl site crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_trawl::config::{load_config_with_hash, Config};
use sumi_trawl::crawler::{Coordinator, CrawlReport};
use tracing_subscriber::EnvFilter;

/// Sumi-Trawl: a polite single-site crawler
///
/// Sumi-Trawl crawls one domain breadth-first while respecting robots.txt
/// and writes every fetched page (title, content, anchor texts, outlinks,
/// attachments and raw HTML) to numbered JSON shards for indexing and link
/// analysis.
#[derive(Parser, Debug)]
#[command(name = "sumi-trawl")]
#[command(version = "1.0.0")]
#[command(about = "A polite single-site crawler", long_about = None)]
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
    #[arg(long, conflicts_with_all = ["stats", "export_graph", "rank"])]
    dry_run: bool,

    /// Show statistics of the latest run from the ledger and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_graph", "rank"])]
    stats: bool,

    /// Build the link graph from existing shards, write it to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats", "rank"])]
    export_graph: Option<PathBuf>,

    /// Re-rank search hits from HITS using the [ranking] weights and exit
    #[arg(long, value_name = "HITS", conflicts_with_all = ["dry_run", "stats", "export_graph"])]
    rank: Option<PathBuf>,

    /// Authority scores (URL to score JSON) used by --rank
    #[arg(long, value_name = "SCORES", requires = "rank")]
    authority: Option<PathBuf>,
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
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(path) = &cli.export_graph {
        handle_export_graph(&config, path)?;
    } else if let Some(hits) = &cli.rank {
        handle_rank(&config, hits, cli.authority.as_deref())?;
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_trawl=info,warn"),
            1 => EnvFilter::new("sumi_trawl=debug,info"),
            2 => EnvFilter::new("sumi_trawl=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Trawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!(
        "  Restricted domain: {}",
        config.restricted_domain().unwrap_or_default()
    );
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Request delay: {}ms", config.crawler.request_delay);
    println!("  Request timeout: {}ms", config.crawler.request_timeout);
    println!("  Content selector: {}", config.crawler.content_selector);
    println!("  Content max chars: {}", config.crawler.content_max_chars);
    println!(
        "  Robots failure policy: {:?}",
        config.crawler.robots_failure_policy
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Shards: {}", config.output.output_dir().display());
    println!("  Ledger: {}", config.output.ledger_path().display());

    println!("\nRanking:");
    println!("  Relevance weight: {}", config.ranking.relevance_weight);
    println!("  Authority weight: {}", config.ranking.authority_weight);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the ledger
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use sumi_trawl::output::{load_statistics, print_statistics};
    use sumi_trawl::storage::SqliteStorage;

    let ledger = config.output.ledger_path();
    if !ledger.exists() {
        bail!("No ledger found at {}; run a crawl first", ledger.display());
    }

    println!("Ledger: {}\n", ledger.display());

    let storage = SqliteStorage::new(&ledger)
        .with_context(|| format!("Failed to open ledger {}", ledger.display()))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-graph mode: writes the link graph edge list
fn handle_export_graph(config: &Config, path: &Path) -> anyhow::Result<()> {
    use sumi_trawl::output::graph_from_shards;

    let shard_dir = config.output.output_dir();
    println!("=== Exporting Link Graph ===\n");
    println!("Shards: {}", shard_dir.display());
    println!("Output: {}", path.display());
    println!();

    let graph = graph_from_shards(&shard_dir)
        .with_context(|| format!("Failed to read shards from {}", shard_dir.display()))?;
    graph.export_edges(path)?;

    println!(
        "✓ {} nodes, {} edges exported to: {}",
        graph.node_count(),
        graph.edge_count(),
        path.display()
    );

    let top = graph.top_linked(10);
    if !top.is_empty() {
        println!("\nMost linked pages:");
        for (url, incoming) in top {
            println!("  {:>6}  {}", incoming, url);
        }
    }

    Ok(())
}

/// Handles the --rank mode: blends relevance with link authority
fn handle_rank(config: &Config, hits_path: &Path, authority: Option<&Path>) -> anyhow::Result<()> {
    use sumi_trawl::output::{load_hits, AuthorityScores, ScoreBlender};

    let hits = load_hits(hits_path)
        .with_context(|| format!("Failed to read search hits from {}", hits_path.display()))?;
    let scores = match authority {
        Some(path) => AuthorityScores::load(path)
            .with_context(|| format!("Failed to read authority scores from {}", path.display()))?,
        None => {
            tracing::warn!("No --authority file given; ranking by relevance only");
            AuthorityScores::default()
        }
    };

    let blender = ScoreBlender::from_config(&config.ranking);
    println!(
        "=== Ranked Results ({} x relevance + {} x authority) ===\n",
        blender.relevance_weight, blender.authority_weight
    );
    for (position, hit) in blender.rank(hits, &scores).iter().enumerate() {
        println!(
            "{:>3}. {:.4}  {}  (relevance {:.4}, authority {:.4})",
            position + 1,
            hit.score,
            hit.url,
            hit.relevance,
            hit.authority
        );
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let mut coordinator = Coordinator::new(config, config_hash)?;

    let abort = coordinator.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current page and flushing");
            abort.abort();
        }
    });

    let report = coordinator.run().await.context("Crawl failed")?;
    print_report(&report);

    Ok(())
}

fn print_report(report: &CrawlReport) {
    println!("\n=== Crawl Finished (run {}) ===", report.run_id);
    if let Some(reason) = report.stop_reason {
        println!("  Stopped: {:?}", reason);
    }
    println!("  Pages fetched: {}", report.pages_fetched);
    println!("  Disallowed by robots.txt: {}", report.skipped_disallowed);
    println!("  Fetch failures: {}", report.fetch_failures);
    println!("  Shards written: {}", report.shards.len());
    for shard in &report.shards {
        println!("    {} ({} records)", shard.path.display(), shard.records);
    }
}
