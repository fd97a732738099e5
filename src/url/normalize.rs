use crate::UrlError;
use url::Url;

/// Canonicalizes a URL for frontier identity and deduplication
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not http or https
/// 3. Reject URLs without a host
/// 4. Remove the fragment (everything after #)
///
/// Scheme, host, path and query are otherwise kept verbatim as the `url`
/// crate parses them (lowercased host, `/` for an empty path). Trailing
/// slashes are significant: `/a` and `/a/` are distinct pages.
///
/// # Arguments
///
/// * `url_str` - The URL string to canonicalize
///
/// # Returns
///
/// * `Ok(Url)` - Canonical URL
/// * `Err(UrlError)` - Failed to parse or the URL is not crawlable
///
/// # Examples
///
/// ```
/// use sumi_trawl::url::canonicalize;
///
/// let url = canonicalize("https://EXAMPLE.com/page/?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page/?b=2&a=1");
/// ```
pub fn canonicalize(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize_url(url)
}

/// Canonicalizes an already parsed URL (see [`canonicalize`])
pub fn canonicalize_url(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_fragment() {
        let result = canonicalize("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_empty_fragment_removed() {
        let result = canonicalize("https://example.com/page#").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_trailing_slash_is_significant() {
        let with_slash = canonicalize("https://example.com/page/").unwrap();
        let without = canonicalize("https://example.com/page").unwrap();
        assert_ne!(with_slash, without);
    }

    #[test]
    fn test_query_kept_verbatim() {
        let result = canonicalize("https://example.com/page?b=2&a=1&utm_source=x").unwrap();
        assert_eq!(
            result.as_str(),
            "https://example.com/page?b=2&a=1&utm_source=x"
        );
    }

    #[test]
    fn test_scheme_kept() {
        let result = canonicalize("http://example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_lowercase_domain() {
        let result = canonicalize("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = canonicalize("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = canonicalize("ftp://example.com/page");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));

        let result = canonicalize("mailto:someone@example.com");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        let result = canonicalize("not a url");
        assert!(matches!(result.unwrap_err(), UrlError::Parse(_)));
    }
}
