use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Sumi-Trawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
}

impl Config {
    /// Returns the domain the crawl is restricted to
    ///
    /// This is the explicitly configured `restricted-domain`, or the host of
    /// the start URL when none is configured. Always lowercase.
    pub fn restricted_domain(&self) -> Option<String> {
        match &self.crawler.restricted_domain {
            Some(domain) => Some(domain.trim().to_lowercase()),
            None => url::Url::parse(&self.crawler.start_url)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.to_lowercase())),
        }
    }
}

/// What the politeness resolver does when robots.txt cannot be retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RobotsFailurePolicy {
    /// Treat the origin as unrestricted
    #[default]
    Open,
    /// Treat the origin as fully disallowed (server and network errors only)
    Closed,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Seed URL the crawl starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Domain the crawl is confined to (defaults to the seed host)
    #[serde(rename = "restricted-domain", default)]
    pub restricted_domain: Option<String>,

    /// Maximum number of pages to fetch successfully
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u64,

    /// Number of page records per shard file
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Delay between consecutive fetches (milliseconds)
    #[serde(rename = "request-delay", default = "default_request_delay")]
    pub request_delay: u64,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Maximum characters of fallback page text kept as content
    #[serde(rename = "content-max-chars", default = "default_content_max_chars")]
    pub content_max_chars: usize,

    /// CSS selector of the main content region
    #[serde(rename = "content-selector", default = "default_content_selector")]
    pub content_selector: String,

    #[serde(rename = "robots-failure-policy", default)]
    pub robots_failure_policy: RobotsFailurePolicy,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }
}

fn default_max_pages() -> u64 {
    100_000
}

fn default_batch_size() -> usize {
    3000
}

fn default_request_delay() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_content_max_chars() -> usize {
    2000
}

fn default_content_selector() -> String {
    "div.article-content".to_string()
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving `data_<n>.json` shard files
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Path to the SQLite run ledger (defaults to `<output-dir>/crawl.db`)
    #[serde(rename = "ledger-path", default)]
    pub ledger_path: Option<String>,
}

impl OutputConfig {
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    pub fn ledger_path(&self) -> PathBuf {
        match &self.ledger_path {
            Some(path) => PathBuf::from(path),
            None => self.output_dir().join("crawl.db"),
        }
    }
}

/// Weights used when blending text relevance with link authority
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RankingConfig {
    #[serde(rename = "relevance-weight", default = "default_relevance_weight")]
    pub relevance_weight: f64,

    #[serde(rename = "authority-weight", default = "default_authority_weight")]
    pub authority_weight: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            relevance_weight: default_relevance_weight(),
            authority_weight: default_authority_weight(),
        }
    }
}

fn default_relevance_weight() -> f64 {
    0.7
}

fn default_authority_weight() -> f64 {
    0.3
}
