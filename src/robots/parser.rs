//! Robots.txt disallow-rule parsing
//!
//! Only `Disallow:` lines are honored, and they apply regardless of the
//! `User-agent` group they appear in. `Allow:`, wildcards, `Crawl-delay` and
//! every other directive are ignored.

use url::Url;

/// Ordered list of path prefixes an origin forbids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisallowRuleset {
    rules: Vec<String>,
}

impl DisallowRuleset {
    /// Parses the disallow rules out of raw robots.txt content
    ///
    /// A rule is the trimmed value after the first `:` of any line whose
    /// directive starts with `disallow` (case-insensitive). Inline `#`
    /// comments are stripped. Empty rules are kept but never match.
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_trawl::robots::DisallowRuleset;
    ///
    /// let rules = DisallowRuleset::parse("User-agent: *\nDisallow: /private\nAllow: /private/ok");
    /// assert_eq!(rules.rules(), &["/private".to_string()]);
    /// ```
    pub fn parse(content: &str) -> Self {
        let rules = content
            .lines()
            .filter_map(|line| {
                let line = line.split('#').next().unwrap_or("").trim();
                if !line.to_ascii_lowercase().starts_with("disallow") {
                    return None;
                }
                line.split_once(':')
                    .map(|(_, value)| value.trim().to_string())
            })
            .collect();

        Self { rules }
    }

    /// Builds a ruleset from explicit path prefixes
    pub fn from_rules<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: rules.into_iter().map(Into::into).collect(),
        }
    }

    /// A ruleset that allows everything
    ///
    /// Used when robots.txt is absent or could not be fetched.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// A ruleset that forbids every path of the origin
    pub fn deny_all() -> Self {
        Self::from_rules(["/"])
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Checks a URL path against the rules
    ///
    /// A path is disallowed iff it starts with any non-empty rule.
    pub fn is_path_allowed(&self, path: &str) -> bool {
        !self
            .rules
            .iter()
            .any(|rule| !rule.is_empty() && path.starts_with(rule.as_str()))
    }

    /// Checks whether a URL may be fetched under these rules
    pub fn is_allowed(&self, url: &Url) -> bool {
        self.is_path_allowed(url.path())
    }
}
