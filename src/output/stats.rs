//! Statistics generation from the run ledger
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::state::PageOutcome;
use crate::storage::{FetchLogRecord, RunRecord, ShardRecord, Storage};
use crate::Result;
use std::collections::HashMap;

/// Number of recent failures shown by `print_statistics`
const RECENT_FAILURES: usize = 10;

/// Crawl statistics summary for the latest run
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Number of runs recorded in the ledger
    pub total_runs: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Count of dequeued URLs by outcome
    pub outcomes: HashMap<PageOutcome, u64>,

    /// Shards written by the latest run
    pub shards: Vec<ShardRecord>,

    /// Most recent failed fetches
    pub recent_failures: Vec<FetchLogRecord>,
}

impl CrawlStatistics {
    /// Total URLs the latest run dequeued
    pub fn total_urls(&self) -> u64 {
        self.outcomes.values().sum()
    }

    pub fn outcome_count(&self, outcome: PageOutcome) -> u64 {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// URLs that were actually requested over HTTP
    pub fn requests_made(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|(outcome, _)| outcome.was_requested())
            .map(|(_, count)| count)
            .sum()
    }

    /// Requests that produced a page record
    pub fn successful_requests(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|(outcome, _)| outcome.is_success())
            .map(|(_, count)| count)
            .sum()
    }

    /// Records across all shards of the latest run
    pub fn shard_records(&self) -> u64 {
        self.shards.iter().map(|s| s.record_count).sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(TrawlError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics> {
    let total_runs = storage.count_runs()?;
    let latest_run = storage.get_latest_run()?;

    let (outcomes, shards, recent_failures) = match &latest_run {
        Some(run) => (
            storage.count_outcomes(run.id)?,
            storage.get_shards(run.id)?,
            storage.get_failures(run.id, RECENT_FAILURES)?,
        ),
        None => (HashMap::new(), Vec::new(), Vec::new()),
    };

    Ok(CrawlStatistics {
        total_runs,
        latest_run,
        outcomes,
        shards,
        recent_failures,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    let Some(run) = &stats.latest_run else {
        println!("No crawl runs recorded yet.");
        return;
    };

    println!("Latest Run (#{} of {}):", run.id, stats.total_runs);
    println!("  Status: {}", run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    println!(
        "  Finished: {}",
        run.finished_at.as_deref().unwrap_or("(not finished)")
    );
    println!("  Config hash: {}", run.config_hash);
    println!();

    let total = stats.total_urls();
    println!("URLs by Outcome:");
    for outcome in PageOutcome::all() {
        let count = stats.outcome_count(outcome);
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", outcome, count, percentage);
    }
    println!();

    println!(
        "Shards: {} ({} records)",
        stats.shards.len(),
        stats.shard_records()
    );
    for shard in &stats.shards {
        println!("  - #{} {} ({} records)", shard.shard_index, shard.path, shard.record_count);
    }
    println!();

    if !stats.recent_failures.is_empty() {
        println!("Recent Failures:");
        for failure in &stats.recent_failures {
            println!(
                "  {} - {}",
                failure.url,
                failure.message.as_deref().unwrap_or("unknown error")
            );
        }
        println!();
    }

    let fetched = stats.successful_requests();
    let requested = stats.requests_made();
    let success_rate = if requested > 0 {
        (fetched as f64 / requested as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} requests succeeded)",
        success_rate, fetched, requested
    );
}
