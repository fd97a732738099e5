//! Storage module for the crawl run ledger
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Run tracking (start, status, final counters)
//! - Shard bookkeeping
//! - Per-URL fetch outcomes

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::PageOutcome;

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_fetched: u64,
    pub shards_written: u64,
}

/// A shard file written during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardRecord {
    pub run_id: i64,
    pub shard_index: u64,
    pub path: String,
    pub record_count: u64,
    pub written_at: String,
}

/// One row of the fetch log
#[derive(Debug, Clone)]
pub struct FetchLogRecord {
    pub url: String,
    pub outcome: PageOutcome,
    pub status_code: Option<u16>,
    pub message: Option<String>,
    pub at: String,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
