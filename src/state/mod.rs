//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageOutcome`: How the crawl disposed of each dequeued URL
//! - `CrawlState`: Run-wide counters and the `Running -> Done` phase

mod crawl_state;
mod outcome;

// Re-export main types
pub use crawl_state::{CrawlPhase, CrawlState, StopReason};
pub use outcome::PageOutcome;
