//! Robots.txt handling module
//!
//! This module fetches, parses and caches each origin's robots.txt disallow
//! rules and answers whether a candidate URL may be fetched.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::DisallowRuleset;

use crate::config::RobotsFailurePolicy;
use crate::url::origin_key;
use reqwest::Client;
use thiserror::Error;
use url::Url;

/// Reasons robots.txt could not be retrieved
#[derive(Debug, Error)]
pub enum RobotsError {
    #[error("robots.txt returned HTTP {0}")]
    Status(u16),

    #[error("robots.txt request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl RobotsError {
    /// True when the server answered that no robots file exists (4xx)
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Status(code) if (400..500).contains(code))
    }
}

/// Fetches and parses robots.txt for an origin
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `origin` - The origin, e.g. `https://example.com`
///
/// # Returns
///
/// * `Ok(DisallowRuleset)` - The origin served a 2xx robots.txt
/// * `Err(RobotsError)` - Non-2xx status, timeout or network error
pub async fn fetch_robots(client: &Client, origin: &str) -> Result<DisallowRuleset, RobotsError> {
    let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    let response = client.get(&robots_url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RobotsError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    Ok(DisallowRuleset::parse(&body))
}

/// Checks if a URL is allowed by a ruleset
///
/// Unparseable URLs are reported as allowed; the fetcher rejects them later.
///
/// # Example
///
/// ```
/// use sumi_trawl::robots::{is_allowed, DisallowRuleset};
///
/// let rules = DisallowRuleset::from_rules(["/private"]);
/// assert!(!is_allowed(&rules, "https://h/private/x"));
/// assert!(is_allowed(&rules, "https://h/public"));
/// assert!(is_allowed(&DisallowRuleset::allow_all(), "https://h/private/x"));
/// ```
pub fn is_allowed(rules: &DisallowRuleset, url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => rules.is_allowed(&parsed),
        Err(_) => true,
    }
}

/// Resolves, caches and applies robots.txt rules for every origin of a crawl
///
/// Rules are loaded lazily on first use of an origin and kept for the rest of
/// the run; there is no refresh.
pub struct RobotsResolver {
    client: Client,
    cache: RobotsCache,
    policy: RobotsFailurePolicy,
}

impl RobotsResolver {
    pub fn new(client: Client, policy: RobotsFailurePolicy) -> Self {
        Self {
            client,
            cache: RobotsCache::new(),
            policy,
        }
    }

    /// Returns the disallow rules for an origin, fetching them on first use
    pub async fn rules_for(&self, origin: &str) -> DisallowRuleset {
        self.cache
            .get_or_fetch(origin, || async {
                tracing::debug!("Fetching robots.txt for {}", origin);
                match fetch_robots(&self.client, origin).await {
                    Ok(rules) => {
                        tracing::debug!("{} disallow rules for {}", rules.rules().len(), origin);
                        rules
                    }
                    Err(e) => self.on_failure(origin, &e),
                }
            })
            .await
    }

    /// Checks whether a URL may be fetched
    pub async fn is_allowed(&self, url: &Url) -> bool {
        let rules = self.rules_for(&origin_key(url)).await;
        rules.is_allowed(url)
    }

    /// Number of origins whose rules are cached
    pub fn cached_origins(&self) -> usize {
        self.cache.len()
    }

    fn on_failure(&self, origin: &str, error: &RobotsError) -> DisallowRuleset {
        match self.policy {
            RobotsFailurePolicy::Open => {
                tracing::warn!("robots.txt unavailable for {}: {}; crawling unrestricted", origin, error);
                DisallowRuleset::allow_all()
            }
            RobotsFailurePolicy::Closed if error.is_missing() => {
                tracing::info!("No robots.txt for {} ({}); crawling unrestricted", origin, error);
                DisallowRuleset::allow_all()
            }
            RobotsFailurePolicy::Closed => {
                tracing::warn!("robots.txt unavailable for {}: {}; skipping origin", origin, error);
                DisallowRuleset::deny_all()
            }
        }
    }
}
