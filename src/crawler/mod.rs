//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The breadth-first URL frontier
//! - HTTP fetching
//! - HTML parsing, link classification and content extraction
//! - Overall crawl coordination
//!
//! [`run_crawl`] runs a whole crawl from a loaded configuration; use
//! [`Coordinator`] directly to hold an [`AbortHandle`] while it runs.

mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use coordinator::{run_crawl, AbortHandle, Coordinator, CrawlReport};
pub use fetcher::{build_http_client, fetch_url, FetchResult, MAX_REDIRECTS};
pub use frontier::Frontier;
pub use parser::{extract_page, truncate_chars, visible_text, ExtractOptions, ExtractedPage};

