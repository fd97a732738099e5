//! URL handling module for Sumi-Trawl
//!
//! This module provides URL canonicalization, domain extraction, restricted
//! domain checks, origin keys for politeness, and attachment classification.

mod domain;
mod normalize;

use ::url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_within_domain, origin_key};
pub use normalize::{canonicalize, canonicalize_url};

/// File suffixes that mark a link as a downloadable attachment
pub const ATTACHMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx"];

/// Link classification for an in-domain URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Ordinary page - followed by the crawler
    Page,
    /// Document download - recorded but never fetched
    Attachment,
}

/// Classifies a URL by the file suffix of its path (case-insensitive)
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_trawl::url::{classify_link, LinkKind};
///
/// let url = Url::parse("https://example.com/files/Report.PDF").unwrap();
/// assert_eq!(classify_link(&url), LinkKind::Attachment);
///
/// let url = Url::parse("https://example.com/news/1.html").unwrap();
/// assert_eq!(classify_link(&url), LinkKind::Page);
/// ```
pub fn classify_link(url: &Url) -> LinkKind {
    let last_segment = url.path().rsplit('/').next().unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && ATTACHMENT_EXTENSIONS
                    .iter()
                    .any(|candidate| ext.eq_ignore_ascii_case(candidate)) =>
        {
            LinkKind::Attachment
        }
        _ => LinkKind::Page,
    }
}
