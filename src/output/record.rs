//! Page records and the in-memory batch that collects them

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One successfully fetched page, as written to a shard file
///
/// Set-valued fields are ordered so shard output is deterministic. Missing
/// fields default to empty when reading shards produced by other tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub anchor_texts: BTreeSet<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub outlinks: BTreeSet<String>,
    #[serde(default)]
    pub attachments: BTreeSet<String>,
    #[serde(default)]
    pub raw_html: String,
}

/// Page records waiting to be flushed to the next shard
#[derive(Debug)]
pub struct Batch {
    records: Vec<PageRecord>,
    capacity: usize,
}

impl Batch {
    /// Creates an empty batch; a capacity of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    pub fn push(&mut self, record: PageRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drains the batch, leaving it empty
    pub fn take(&mut self) -> Vec<PageRecord> {
        std::mem::take(&mut self.records)
    }
}
