//! URL frontier: FIFO queue of pending URLs plus the seen-set
//!
//! A URL enters the pending queue at most once over the frontier's lifetime.
//! The seen-set is never pruned, so a URL that was dequeued and fetched can
//! not be enqueued again.

use std::collections::{HashSet, VecDeque};
use url::Url;

/// Breadth-first frontier keyed by canonical URL string
#[derive(Debug, Default)]
pub struct Frontier {
    pending: VecDeque<Url>,
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier holding a single seed URL
    pub fn with_seed(seed: Url) -> Self {
        let mut frontier = Self::new();
        frontier.enqueue(seed);
        frontier
    }

    /// Appends a URL unless it has been seen before
    ///
    /// Returns `true` if the URL was queued.
    pub fn enqueue(&mut self, url: Url) -> bool {
        if !self.seen.insert(url.as_str().to_string()) {
            tracing::trace!("Frontier already saw {}", url);
            return false;
        }

        self.pending.push_back(url);
        true
    }

    /// Removes the oldest pending URL
    pub fn dequeue(&mut self) -> Option<Url> {
        self.pending.pop_front()
    }

    /// Records a URL as seen without queueing it
    ///
    /// Used for redirect targets so the same page is not fetched twice under
    /// two names. Returns `true` if the URL was new.
    pub fn mark_seen(&mut self, url: &Url) -> bool {
        self.seen.insert(url.as_str().to_string())
    }

    /// Returns true if the URL has ever been queued or marked seen
    pub fn contains(&self, url: &Url) -> bool {
        self.seen.contains(url.as_str())
    }

    /// Number of URLs waiting to be dequeued
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of distinct URLs the frontier has seen
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
