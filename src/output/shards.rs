//! Shard files: durable, numbered JSON batches of page records
//!
//! Each flush writes `data_<n>.json` through a temporary file that is synced
//! and then renamed into place, so a crash leaves either a complete shard or
//! none at all.

use crate::output::PageRecord;
use crate::{Result, TrawlError};
use serde::Deserialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const SHARD_PREFIX: &str = "data_";
const SHARD_SUFFIX: &str = ".json";

/// A shard that has been written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardInfo {
    pub index: u64,
    pub path: PathBuf,
    pub records: usize,
}

/// Writes page record batches to numbered shard files
#[derive(Debug, Clone)]
pub struct ShardWriter {
    dir: PathBuf,
}

impl ShardWriter {
    /// Creates the writer, creating the output directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| TrawlError::Persistence {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the shard with the given number
    pub fn shard_path(&self, index: u64) -> PathBuf {
        self.dir.join(shard_file_name(index))
    }

    /// Lowest shard number above every shard already in the directory
    pub fn next_free_index(&self) -> Result<u64> {
        let highest = list_shards(&self.dir)?
            .last()
            .map(|(index, _)| *index)
            .unwrap_or(0);
        Ok(highest + 1)
    }

    /// Writes one batch as shard `index`
    ///
    /// # Errors
    ///
    /// * `TrawlError::ShardExists` - A shard with this number is already on disk
    /// * `TrawlError::Json` - The records could not be serialized
    /// * `TrawlError::Persistence` - Writing, syncing or renaming failed
    pub fn flush(&self, records: &[PageRecord], index: u64) -> Result<ShardInfo> {
        let path = self.shard_path(index);
        if path.exists() {
            return Err(TrawlError::ShardExists { path });
        }

        let mut json = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut json, PrettyFormatter::with_indent(b"    "));
        serde::Serialize::serialize(records, &mut serializer)?;

        let tmp_path = path.with_extension("json.tmp");
        write_synced(&tmp_path, &json).map_err(|source| TrawlError::Persistence {
            path: tmp_path.clone(),
            source,
        })?;

        fs::rename(&tmp_path, &path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            TrawlError::Persistence {
                path: path.clone(),
                source,
            }
        })?;

        tracing::info!("Wrote shard {} ({} records) to {}", index, records.len(), path.display());

        Ok(ShardInfo {
            index,
            path,
            records: records.len(),
        })
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// File name of shard `index`: `data_<index>.json`
pub fn shard_file_name(index: u64) -> String {
    format!("{}{}{}", SHARD_PREFIX, index, SHARD_SUFFIX)
}

/// Parses the shard number out of a file name
pub fn parse_shard_index(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(SHARD_PREFIX)?
        .strip_suffix(SHARD_SUFFIX)?
        .parse()
        .ok()
}

/// Lists the shard files of a directory in numeric order
pub fn list_shards(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut shards = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(parse_shard_index) {
            shards.push((index, entry.path()));
        }
    }

    shards.sort_by_key(|(index, _)| *index);
    Ok(shards)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ShardContents {
    Many(Vec<PageRecord>),
    One(Box<PageRecord>),
}

/// Reads one shard file
///
/// A file holding a single record object instead of an array is read as a
/// one-record shard.
pub fn read_shard(path: &Path) -> Result<Vec<PageRecord>> {
    let content = fs::read_to_string(path)?;
    let records = match serde_json::from_str::<ShardContents>(&content)? {
        ShardContents::Many(records) => records,
        ShardContents::One(record) => vec![*record],
    };
    Ok(records)
}

/// Reads every shard of a directory, in shard order
pub fn read_shards(dir: &Path) -> Result<Vec<PageRecord>> {
    let mut records = Vec::new();
    for (index, path) in list_shards(dir)? {
        let shard = read_shard(&path)?;
        tracing::debug!("Read {} records from shard {}", shard.len(), index);
        records.extend(shard);
    }
    Ok(records)
}
