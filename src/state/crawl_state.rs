//! Crawl-wide counters and the coordinator's state machine

use crate::state::PageOutcome;

/// Coordinator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Running,
    Done,
}

/// Why the crawl left the `Running` phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No URLs left in the frontier
    FrontierExhausted,
    /// The fetched-page counter reached `max-pages`
    PageLimitReached,
    /// A caller requested an abort
    Aborted,
}

/// Process-wide crawl counters, owned and mutated by the coordinator only
#[derive(Debug, Clone)]
pub struct CrawlState {
    pub phase: CrawlPhase,
    pub stop_reason: Option<StopReason>,
    pub pages_fetched: u64,
    pub batches_flushed: u64,
    /// Number the next shard file will carry (1-based, never reused)
    pub next_shard_index: u64,
    pub skipped_disallowed: u64,
    pub fetch_failures: u64,
    pub skipped_duplicates: u64,
    max_pages: u64,
}

impl CrawlState {
    pub fn new(max_pages: u64) -> Self {
        Self {
            phase: CrawlPhase::Running,
            stop_reason: None,
            pages_fetched: 0,
            batches_flushed: 0,
            next_shard_index: 1,
            skipped_disallowed: 0,
            fetch_failures: 0,
            skipped_duplicates: 0,
            max_pages,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == CrawlPhase::Running
    }

    /// Returns true once the fetched counter has reached the ceiling
    pub fn page_limit_reached(&self) -> bool {
        self.pages_fetched >= self.max_pages
    }

    /// Moves to `Done`; the first reason recorded wins
    pub fn finish(&mut self, reason: StopReason) {
        if self.phase == CrawlPhase::Running {
            self.phase = CrawlPhase::Done;
            self.stop_reason = Some(reason);
        }
    }

    /// Updates the counters for one dequeued URL
    pub fn record(&mut self, outcome: PageOutcome) {
        match outcome {
            PageOutcome::Fetched => self.pages_fetched += 1,
            PageOutcome::Disallowed => self.skipped_disallowed += 1,
            PageOutcome::FetchFailed => self.fetch_failures += 1,
            PageOutcome::Skipped => self.skipped_duplicates += 1,
        }
    }

    /// Claims the next shard number
    pub fn take_shard_index(&mut self) -> u64 {
        let index = self.next_shard_index;
        self.next_shard_index += 1;
        self.batches_flushed += 1;
        index
    }
}
