//! Page-numbered listing URLs
//!
//! A listing URL encodes its page number as a run of digits between a literal
//! marker and a suffix, e.g. `http://host/list_p101_p20.html` is page `1` with
//! marker `p10` and suffix `_p20.html`.

use crate::PageUrlError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Marker used by the default codec
pub const DEFAULT_PAGE_MARKER: &str = "p10";

/// Suffix pattern used by the default codec
pub const DEFAULT_PAGE_SUFFIX: &str = r"_p\d*\.html";

static DEFAULT_CODEC: Lazy<PageUrlCodec> = Lazy::new(|| {
    PageUrlCodec::new(DEFAULT_PAGE_MARKER, DEFAULT_PAGE_SUFFIX)
        .expect("default page template is a valid pattern")
});

/// A listing URL split around its page number
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageUrl {
    prefix: String,
    page: u32,
    suffix: String,
}

impl PageUrl {
    /// Builds a page URL from its parts
    pub fn new(prefix: impl Into<String>, page: u32, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            page,
            suffix: suffix.into(),
        }
    }

    /// Everything before the page number, marker included
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The page number
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Everything after the page number
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Renders the URL of page `n` of the same listing
    pub fn render(&self, n: u32) -> String {
        debug_assert!(n >= 1, "page numbers start at 1");
        format!("{}{}{}", self.prefix, n, self.suffix)
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(self.page))
    }
}

/// Parses listing URLs against one page-number template
#[derive(Debug, Clone)]
pub struct PageUrlCodec {
    pattern: Regex,
}

impl PageUrlCodec {
    /// Creates a codec for URLs shaped `<anything><marker><digits><suffix>`
    ///
    /// `marker` is matched literally, `suffix_pattern` is a regular expression
    /// anchored at the end of the URL. The marker is matched greedily, so the
    /// last marker that is followed by digits and a valid suffix wins.
    pub fn new(marker: &str, suffix_pattern: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"^(.*{})(\d+)({})$",
            regex::escape(marker),
            suffix_pattern
        ))?;
        Ok(Self { pattern })
    }

    /// Splits `url` into prefix, page number and suffix
    ///
    /// # Errors
    ///
    /// `PageUrlError::NotPaginated` when the URL does not match the template or
    /// carries page number 0.
    pub fn parse(&self, url: &str) -> Result<PageUrl, PageUrlError> {
        let not_paginated = || PageUrlError::NotPaginated(url.to_string());

        let captures = self.pattern.captures(url).ok_or_else(not_paginated)?;
        let page: u32 = captures[2].parse().map_err(|_| not_paginated())?;
        if page == 0 {
            return Err(not_paginated());
        }

        Ok(PageUrl::new(&captures[1], page, &captures[3]))
    }
}

impl Default for PageUrlCodec {
    fn default() -> Self {
        DEFAULT_CODEC.clone()
    }
}
