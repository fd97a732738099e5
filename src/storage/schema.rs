//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the Sumi-Trawl run ledger.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    shards_written INTEGER NOT NULL DEFAULT 0
);

-- Shards written by each run
CREATE TABLE IF NOT EXISTS shards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    shard_index INTEGER NOT NULL,
    path TEXT NOT NULL,
    record_count INTEGER NOT NULL,
    written_at TEXT NOT NULL,
    UNIQUE(run_id, shard_index)
);

CREATE INDEX IF NOT EXISTS idx_shards_run ON shards(run_id);

-- One row per dequeued URL
CREATE TABLE IF NOT EXISTS fetch_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    url TEXT NOT NULL,
    outcome TEXT NOT NULL,
    status_code INTEGER,
    message TEXT,
    at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fetch_log_run ON fetch_log(run_id);
CREATE INDEX IF NOT EXISTS idx_fetch_log_outcome ON fetch_log(run_id, outcome);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Schema version stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;
