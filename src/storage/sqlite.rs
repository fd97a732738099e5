//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::PageOutcome;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{FetchLogRecord, RunRecord, RunStatus, ShardRecord};
use crate::TrawlError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, pages_fetched, shards_written";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// The parent directory is created if it does not exist.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(TrawlError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, TrawlError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, TrawlError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        pages_fetched: row.get::<_, i64>(5)? as u64,
        shards_written: row.get::<_, i64>(6)? as u64,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_fetched: u64,
        shards_written: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_fetched = ?3, shards_written = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                pages_fetched as i64,
                shards_written as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Shards =====

    fn record_shard(
        &mut self,
        run_id: i64,
        shard_index: u64,
        path: &str,
        record_count: usize,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO shards (run_id, shard_index, path, record_count, written_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, shard_index as i64, path, record_count as i64, now],
        )?;
        Ok(())
    }

    fn get_shards(&self, run_id: i64) -> StorageResult<Vec<ShardRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, shard_index, path, record_count, written_at
             FROM shards WHERE run_id = ?1 ORDER BY shard_index",
        )?;

        let shards = stmt
            .query_map(params![run_id], |row| {
                Ok(ShardRecord {
                    run_id: row.get(0)?,
                    shard_index: row.get::<_, i64>(1)? as u64,
                    path: row.get(2)?,
                    record_count: row.get::<_, i64>(3)? as u64,
                    written_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(shards)
    }

    // ===== Fetch Log =====

    fn record_fetch(
        &mut self,
        run_id: i64,
        url: &str,
        outcome: PageOutcome,
        status_code: Option<u16>,
        message: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO fetch_log (run_id, url, outcome, status_code, message, at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![run_id, url, outcome.to_db_string(), status_code, message, now],
        )?;
        Ok(())
    }

    fn count_outcomes(&self, run_id: i64) -> StorageResult<HashMap<PageOutcome, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT outcome, COUNT(*) FROM fetch_log WHERE run_id = ?1 GROUP BY outcome",
        )?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (outcome, count) = row?;
            match PageOutcome::from_db_string(&outcome) {
                Some(outcome) => {
                    counts.insert(outcome, count as u64);
                }
                None => {
                    return Err(StorageError::Database(format!(
                        "Unknown outcome '{}' in fetch_log",
                        outcome
                    )))
                }
            }
        }

        Ok(counts)
    }

    fn get_failures(&self, run_id: i64, limit: usize) -> StorageResult<Vec<FetchLogRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, outcome, status_code, message, at FROM fetch_log
             WHERE run_id = ?1 AND outcome = ?2 ORDER BY id DESC LIMIT ?3",
        )?;

        let failures = stmt
            .query_map(
                params![run_id, PageOutcome::FetchFailed.to_db_string(), limit as i64],
                |row| {
                    Ok(FetchLogRecord {
                        url: row.get(0)?,
                        outcome: PageOutcome::from_db_string(&row.get::<_, String>(1)?)
                            .unwrap_or(PageOutcome::FetchFailed),
                        status_code: row.get(2)?,
                        message: row.get(3)?,
                        at: row.get(4)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(failures)
    }
}
