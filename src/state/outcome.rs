//! Per-URL outcome definitions recorded in the run ledger
//!
//! Every URL the coordinator dequeues ends in exactly one outcome.

use std::fmt;

/// Represents how the crawl disposed of a dequeued URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// Page was fetched, extracted and appended to the current batch
    Fetched,

    /// Path is excluded by the origin's robots.txt; never requested
    Disallowed,

    /// Request failed (timeout, network error or non-2xx status); not retried
    FetchFailed,

    /// URL had already been processed earlier in the run
    Skipped,
}

impl PageOutcome {
    /// Returns true if this outcome produced a page record
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fetched)
    }

    /// Returns true if an HTTP request for the page was made
    pub fn was_requested(&self) -> bool {
        matches!(self, Self::Fetched | Self::FetchFailed)
    }

    /// Converts the outcome to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Disallowed => "disallowed",
            Self::FetchFailed => "fetch_failed",
            Self::Skipped => "skipped",
        }
    }

    /// Parses an outcome from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "fetched" => Some(Self::Fetched),
            "disallowed" => Some(Self::Disallowed),
            "fetch_failed" => Some(Self::FetchFailed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Returns all possible outcomes
    pub fn all() -> [Self; 4] {
        [
            Self::Fetched,
            Self::Disallowed,
            Self::FetchFailed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
