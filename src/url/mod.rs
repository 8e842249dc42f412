//! URL handling module for Reel-Harvest
//!
//! This module provides the page-number codec for listing URLs and resolution
//! of the relative links found in listing markup.

mod page_url;

pub use page_url::{PageUrl, PageUrlCodec, DEFAULT_PAGE_MARKER, DEFAULT_PAGE_SUFFIX};

use url::Url;

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// # Examples
///
/// ```
/// use reel_harvest::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("http://so.tv.example/list_p101_p20.html").unwrap();
/// assert_eq!(
///     resolve_link("/list_p105_p20.html", &base).as_deref(),
///     Some("http://so.tv.example/list_p105_p20.html")
/// );
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
