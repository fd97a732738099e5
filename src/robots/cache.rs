//! Per-origin robots.txt cache with single-flight population
//!
//! Each origin owns a `OnceCell`; concurrent lookups for an origin that is
//! not yet cached all await the same fetch. Entries live for the whole run.

use crate::robots::DisallowRuleset;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// Cache of disallow rules keyed by `scheme://host[:port]`
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<DisallowRuleset>>>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached rules for an origin, running `fetch` at most once
    ///
    /// # Arguments
    ///
    /// * `origin` - The politeness key of the origin
    /// * `fetch` - Produces the ruleset when the origin is not cached yet
    pub async fn get_or_fetch<F, Fut>(&self, origin: &str, fetch: F) -> DisallowRuleset
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DisallowRuleset>,
    {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.entry(origin.to_string()).or_default().clone()
        };

        cell.get_or_init(fetch).await.clone()
    }

    /// Returns the rules for an origin if they were already fetched
    pub fn get(&self, origin: &str) -> Option<DisallowRuleset> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(origin).and_then(|cell| cell.get().cloned())
    }

    /// Number of origins whose rules are populated
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
