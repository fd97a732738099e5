//! Storage traits and error types
//!
//! This module defines the trait interface for the run ledger and its
//! associated error types.

use crate::state::PageOutcome;
use crate::storage::{FetchLogRecord, RunRecord, RunStatus, ShardRecord};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for run ledger backends
///
/// The ledger is bookkeeping only: page content lives in the shard files.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status and counters of a run and stamps its finish time
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_fetched: u64,
        shards_written: u64,
    ) -> StorageResult<()>;

    /// Counts all runs in the ledger
    fn count_runs(&self) -> StorageResult<u64>;

    // ===== Shards =====

    /// Records a shard written by a run
    fn record_shard(
        &mut self,
        run_id: i64,
        shard_index: u64,
        path: &str,
        record_count: usize,
    ) -> StorageResult<()>;

    /// Gets the shards of a run in shard order
    fn get_shards(&self, run_id: i64) -> StorageResult<Vec<ShardRecord>>;

    // ===== Fetch Log =====

    /// Records the outcome of one dequeued URL
    fn record_fetch(
        &mut self,
        run_id: i64,
        url: &str,
        outcome: PageOutcome,
        status_code: Option<u16>,
        message: Option<&str>,
    ) -> StorageResult<()>;

    /// Counts the URLs of a run per outcome
    fn count_outcomes(&self, run_id: i64) -> StorageResult<HashMap<PageOutcome, u64>>;

    /// Gets the most recent failed fetches of a run
    fn get_failures(&self, run_id: i64, limit: usize) -> StorageResult<Vec<FetchLogRecord>>;
}
