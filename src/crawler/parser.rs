//! HTML parser for extracting links, anchor texts and page content
//!
//! This module turns a fetched page into:
//! - In-domain outlinks to follow
//! - Attachment links (documents that are recorded but never fetched)
//! - Anchor texts of every resolvable link
//! - The page title and a best-effort content string
//!
//! Extraction never fails. Malformed markup is repaired by the HTML parser
//! and whatever cannot be found comes back empty.

use crate::url::{canonicalize_url, classify_link, is_within_domain, LinkKind};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use url::Url;

/// Elements whose text never counts as visible page text
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Content extraction settings
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    content_selector: Selector,
    content_max_chars: usize,
}

impl ExtractOptions {
    /// Builds extraction options from a CSS selector for the main content
    /// region and the fallback text length limit
    pub fn new(content_selector: &str, content_max_chars: usize) -> Result<Self, ConfigError> {
        let content_selector = Selector::parse(content_selector).map_err(|e| {
            ConfigError::Validation(format!(
                "content_selector '{}' is not a valid CSS selector: {:?}",
                content_selector, e
            ))
        })?;

        Ok(Self {
            content_selector,
            content_max_chars,
        })
    }

    pub fn content_max_chars(&self) -> usize {
        self.content_max_chars
    }
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Trimmed text of the first `<title>`, empty if none
    pub title: String,

    /// Main content region text, or truncated visible page text
    pub content: String,

    /// In-domain page links, canonical, excluding the page itself
    pub outlinks: BTreeSet<String>,

    /// In-domain document links
    pub attachments: BTreeSet<String>,

    /// Non-empty visible texts of all resolvable anchors
    pub anchor_texts: BTreeSet<String>,
}

/// Parses HTML content and extracts links, anchor texts and content
///
/// # Link Extraction Rules
///
/// 1. Every `<a href>` is trimmed and resolved against `page_url`
/// 2. The fragment is stripped
/// 3. Only http(s) links whose host is `restricted_domain` or one of its
///    subdomains are kept
/// 4. Links whose path ends in a document suffix become attachments, all
///    others outlinks
/// 5. The page's own canonical URL is never an outlink
///
/// Anchor texts are collected for every anchor that resolves, regardless of
/// domain.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The URL the content was served from (after redirects)
/// * `restricted_domain` - The domain the crawl is confined to
/// * `options` - Content extraction settings
///
/// # Example
///
/// ```
/// use sumi_trawl::crawler::{extract_page, ExtractOptions};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let options = ExtractOptions::new("div.article-content", 2000).unwrap();
///
/// let page = extract_page(html, &page_url, "example.com", &options);
/// assert_eq!(page.title, "Test");
/// assert!(page.outlinks.contains("https://example.com/page"));
/// assert!(page.anchor_texts.contains("Link"));
/// ```
pub fn extract_page(
    html: &str,
    page_url: &Url,
    restricted_domain: &str,
    options: &ExtractOptions,
) -> ExtractedPage {
    let document = Html::parse_document(html);

    let mut page = ExtractedPage {
        title: extract_title(&document),
        content: extract_content(&document, options),
        ..ExtractedPage::default()
    };

    let mut self_url = page_url.clone();
    self_url.set_fragment(None);

    let anchor_selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return page,
    };

    for anchor in document.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        let Some(resolved) = resolve_link(href, page_url) else {
            continue;
        };

        let text = visible_text(anchor);
        if !text.is_empty() {
            page.anchor_texts.insert(text);
        }

        let link = match canonicalize_url(resolved) {
            Ok(link) => link,
            Err(e) => {
                tracing::trace!("Ignoring link {}: {}", href.trim(), e);
                continue;
            }
        };

        let in_domain = link
            .host_str()
            .is_some_and(|host| is_within_domain(host, restricted_domain));
        if !in_domain {
            continue;
        }

        match classify_link(&link) {
            LinkKind::Attachment => {
                page.attachments.insert(link.into());
            }
            LinkKind::Page if link == self_url => {}
            LinkKind::Page => {
                page.outlinks.insert(link.into());
            }
        }
    }

    page
}

/// Resolves a link href to an absolute URL
///
/// An empty href resolves to the page itself. Returns None only for hrefs
/// the URL parser rejects.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    base_url.join(href.trim()).ok()
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    let Ok(title_selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Main content region if present, otherwise truncated visible page text
fn extract_content(document: &Html, options: &ExtractOptions) -> String {
    match document.select(&options.content_selector).next() {
        Some(region) => visible_text(region),
        None => truncate_chars(&visible_text(document.root_element()), options.content_max_chars)
            .to_string(),
    }
}

/// Collects the visible text below an element
///
/// Text inside `script`, `style`, `noscript` and `template` is skipped. Each
/// text node is trimmed and the non-empty pieces are joined by single spaces.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut pieces = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }

        let piece = text.trim();
        if !piece.is_empty() {
            pieces.push(piece);
        }
    }

    pieces.join(" ")
}

/// Truncates text to at most `max_chars` characters
///
/// Counts Unicode scalar values, so multi-byte text is never split inside a
/// character. Shorter text is returned unchanged.
///
/// # Example
///
/// ```
/// use sumi_trawl::crawler::truncate_chars;
///
/// assert_eq!(truncate_chars("abcdef", 4), "abcd");
/// assert_eq!(truncate_chars("南开大学", 2), "南开");
/// assert_eq!(truncate_chars("abc", 10), "abc");
/// ```
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "example.com";

    fn page_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn options() -> ExtractOptions {
        ExtractOptions::new("div.article-content", 2000).unwrap()
    }

    fn extract(html: &str) -> ExtractedPage {
        extract_page(html, &page_url(), DOMAIN, &options())
    }

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title>Test Page</title></head><body></body></html>"#;
        assert_eq!(extract(html).title, "Test Page");
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let html = r#"<html><head><title>  Test Page  </title></head><body></body></html>"#;
        assert_eq!(extract(html).title, "Test Page");
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        assert_eq!(extract(html).title, "");
    }

    #[test]
    fn test_extract_relative_link() {
        let html = r#"<html><body><a href="/other">Link</a></body></html>"#;
        let page = extract(html);
        assert_eq!(page.outlinks.len(), 1);
        assert!(page.outlinks.contains("https://example.com/other"));
    }

    #[test]
    fn test_extract_relative_path_link() {
        let html = r#"<html><body><a href="other">Link</a></body></html>"#;
        assert!(extract(html).outlinks.contains("https://example.com/other"));
    }

    #[test]
    fn test_off_domain_link_dropped_but_anchor_kept() {
        let html = r#"<html><body><a href="https://other.com/page">Elsewhere</a></body></html>"#;
        let page = extract(html);
        assert!(page.outlinks.is_empty());
        assert!(page.anchor_texts.contains("Elsewhere"));
    }

    #[test]
    fn test_subdomain_kept_lookalike_dropped() {
        let html = r#"
            <a href="https://news.example.com/a">Sub</a>
            <a href="https://badexample.com/b">Lookalike</a>
        "#;
        let page = extract(html);
        assert_eq!(
            page.outlinks.iter().collect::<Vec<_>>(),
            vec!["https://news.example.com/a"]
        );
    }

    #[test]
    fn test_skip_non_http_schemes() {
        let html = r#"
            <a href="javascript:void(0)">Js</a>
            <a href="mailto:test@example.com">Email</a>
            <a href="tel:+1234567890">Call</a>
        "#;
        let page = extract(html);
        assert!(page.outlinks.is_empty());
        assert!(page.attachments.is_empty());
    }

    #[test]
    fn test_self_loop_suppressed() {
        let html = r##"<html><body>
            <a href="https://example.com/page#section">Jump</a>
            <a href="#top">Top</a>
            <a href="/next">Next</a>
        </body></html>"##;
        let page = extract(html);
        assert!(!page.outlinks.contains("https://example.com/page"));
        assert!(page.outlinks.contains("https://example.com/next"));
        assert_eq!(page.outlinks.len(), 1);
    }

    #[test]
    fn test_fragment_stripped() {
        let html = r##"<a href="/other#frag">Link</a>"##;
        assert!(extract(html).outlinks.contains("https://example.com/other"));
    }

    #[test]
    fn test_attachment_classification() {
        let html = r#"
            <a href="/files/report.PDF">Report</a>
            <a href="/files/sheet.xlsx?v=2">Sheet</a>
            <a href="/news.html">News</a>
        "#;
        let page = extract(html);
        assert!(page.attachments.contains("https://example.com/files/report.PDF"));
        assert!(page.attachments.contains("https://example.com/files/sheet.xlsx?v=2"));
        assert_eq!(page.attachments.len(), 2);
        assert_eq!(page.outlinks.len(), 1);
    }

    #[test]
    fn test_empty_href_keeps_text_without_self_link() {
        let html = r#"<a href="">Top</a><a href="  ">Blank</a><a href="/img"><img src="x.png"></a>"#;
        let page = extract(html);
        assert!(page.anchor_texts.contains("Top"));
        assert!(page.anchor_texts.contains("Blank"));
        assert_eq!(page.anchor_texts.len(), 2);
        assert!(!page.outlinks.contains("https://example.com/page"));
        assert!(page.outlinks.contains("https://example.com/img"));
    }

    #[test]
    fn test_anchor_text_trimmed() {
        let html = r#"<a href="/a">  Campus <b>News</b>  </a>"#;
        let page = extract(html);
        assert!(page.anchor_texts.contains("Campus News"));
    }

    #[test]
    fn test_main_content_region_preferred() {
        let html = r#"
            <html><body>
                <div class="nav">Menu</div>
                <div class="article-content"><p>Body text</p><script>var x;</script></div>
            </body></html>
        "#;
        assert_eq!(extract(html).content, "Body text");
    }

    #[test]
    fn test_fallback_content_truncated() {
        let long = "a".repeat(50);
        let html = format!("<html><body><p>{}</p><style>p {{}}</style></body></html>", long);
        let options = ExtractOptions::new("div.article-content", 10).unwrap();
        let page = extract_page(&html, &page_url(), DOMAIN, &options);
        assert_eq!(page.content, "a".repeat(10));
    }

    #[test]
    fn test_fallback_content_short_untouched() {
        let html = "<html><head><title>T</title></head><body><p>Hello</p></body></html>";
        assert_eq!(extract(html).content, "T Hello");
    }

    #[test]
    fn test_malformed_markup_partial() {
        let html = r#"<html><head><title>Broken<body><a href="/x">X</a><div"#;
        let page = extract(html);
        assert!(page.title.starts_with("Broken"));
        assert!(page.content.len() <= 2000);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("", 5), "");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_invalid_selector_rejected() {
        assert!(ExtractOptions::new("div[", 10).is_err());
    }
}
