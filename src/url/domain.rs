use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_trawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether a host equals the restricted domain or is one of its subdomains
///
/// The comparison is label-aligned: `evil-example.com` is not inside
/// `example.com`, while `news.example.com` is.
///
/// # Examples
///
/// ```
/// use sumi_trawl::url::is_within_domain;
///
/// assert!(is_within_domain("example.com", "example.com"));
/// assert!(is_within_domain("cc.example.com", "example.com"));
/// assert!(!is_within_domain("badexample.com", "example.com"));
/// ```
pub fn is_within_domain(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();

    if domain.is_empty() {
        return false;
    }

    host == domain
        || host
            .strip_suffix(domain.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Returns the politeness key of a URL: `scheme://host[:port]`
///
/// Default ports are omitted, so `https://example.com:443/x` and
/// `https://example.com/y` share a key.
pub fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}
