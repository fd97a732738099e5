//! Output module for crawl results
//!
//! This module handles:
//! - Page records and the in-memory batch
//! - Durable, numbered shard files and reading them back
//! - The link graph and its edge-list export
//! - Blending relevance with link authority
//! - Crawl statistics from the run ledger

mod graph;
mod record;
mod scoring;
mod shards;
pub mod stats;

pub use graph::{Degree, LinkGraph};
pub use record::{Batch, PageRecord};
pub use scoring::{load_hits, AuthorityScores, RankedHit, ScoreBlender, SearchHit};
pub use shards::{
    list_shards, parse_shard_index, read_shard, read_shards, shard_file_name, ShardInfo,
    ShardWriter,
};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::Result;
use std::path::Path;

/// Rebuilds the link graph from every shard in a directory
pub fn graph_from_shards(dir: &Path) -> Result<LinkGraph> {
    let records = read_shards(dir)?;
    Ok(LinkGraph::from_records(&records))
}
