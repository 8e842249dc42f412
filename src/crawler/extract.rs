//! Page scraping
//!
//! This module turns fetched pages into the values the pools need:
//! - Listing pages: item detail links, the next-page control, the last-page widget
//! - Detail pages: the playlist and video identifiers embedded in inline script
//!
//! Both sides sit behind traits so a different site layout can be plugged in
//! without touching the pools.

use crate::config::SiteConfig;
use crate::url::resolve_link;
use crate::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Everything a single listing page exposes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Absolute item detail links, in document order
    pub item_links: Vec<String>,

    /// Target of the next-page control, if present
    pub next_page_url: Option<String>,

    /// Target of the last entry in the page-number widget, if present
    pub last_page_url: Option<String>,
}

/// Extracts item links and pagination controls from a listing page
pub trait ListingLinkExtractor: Send + Sync {
    fn extract_item_links(&self, html: &str, base_url: &Url) -> Vec<String>;

    fn extract_next_page_url(&self, html: &str, base_url: &Url) -> Option<String>;

    fn extract_last_page_url(&self, html: &str, base_url: &Url) -> Option<String>;

    /// Extracts all three at once
    fn scan(&self, html: &str, base_url: &Url) -> ListingPage {
        ListingPage {
            item_links: self.extract_item_links(html, base_url),
            next_page_url: self.extract_next_page_url(html, base_url),
            last_page_url: self.extract_last_page_url(html, base_url),
        }
    }
}

/// CSS-selector driven listing extractor
///
/// An item card contributes the first `a[href]` inside it, or its own href
/// when the card is itself an anchor. Cards without a usable link are skipped.
#[derive(Debug)]
pub struct SelectorExtractor {
    item: Selector,
    next_page: Selector,
    last_page: Selector,
    anchor: Selector,
}

impl SelectorExtractor {
    /// Builds an extractor from the site's selectors
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSelector` naming the selector that failed to parse
    pub fn new(site: &SiteConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            item: parse_selector("item-selector", &site.item_selector)?,
            next_page: parse_selector("next-page-selector", &site.next_page_selector)?,
            last_page: parse_selector("last-page-selector", &site.last_page_selector)?,
            anchor: parse_selector("anchor", "a[href]")?,
        })
    }

    fn item_links(&self, document: &Html, base_url: &Url) -> Vec<String> {
        document
            .select(&self.item)
            .filter_map(|card| self.card_href(card))
            .filter_map(|href| resolve_link(href, base_url))
            .collect()
    }

    fn card_href<'a>(&self, card: ElementRef<'a>) -> Option<&'a str> {
        if card.value().name() == "a" {
            if let Some(href) = card.value().attr("href") {
                return Some(href);
            }
        }

        card.select(&self.anchor)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
    }

    fn next_page(&self, document: &Html, base_url: &Url) -> Option<String> {
        document
            .select(&self.next_page)
            .filter_map(|el| el.value().attr("href"))
            .find_map(|href| resolve_link(href, base_url))
    }

    fn last_page(&self, document: &Html, base_url: &Url) -> Option<String> {
        let last = document.select(&self.last_page).last()?;
        let href = last.value().attr("href")?;
        resolve_link(href, base_url)
    }
}

impl ListingLinkExtractor for SelectorExtractor {
    fn extract_item_links(&self, html: &str, base_url: &Url) -> Vec<String> {
        self.item_links(&Html::parse_document(html), base_url)
    }

    fn extract_next_page_url(&self, html: &str, base_url: &Url) -> Option<String> {
        self.next_page(&Html::parse_document(html), base_url)
    }

    fn extract_last_page_url(&self, html: &str, base_url: &Url) -> Option<String> {
        self.last_page(&Html::parse_document(html), base_url)
    }

    fn scan(&self, html: &str, base_url: &Url) -> ListingPage {
        let document = Html::parse_document(html);
        ListingPage {
            item_links: self.item_links(&document, base_url),
            next_page_url: self.next_page(&document, base_url),
            last_page_url: self.last_page(&document, base_url),
        }
    }
}

fn parse_selector(name: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {}", name, selector, e)))
}

/// Identifiers needed to query the metadata and vote endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIdentifiers {
    pub playlist_id: String,
    pub vid: String,
}

/// Extracts item identifiers from a decoded detail page
pub trait DetailParser: Send + Sync {
    /// Returns the identifiers, or the name of the first one that is missing
    fn extract_identifiers(&self, body: &str) -> Result<ItemIdentifiers, &'static str>;
}

static PLAYLIST_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bplaylistId\s*=\s*["']([^"']+)["']"#)
        .expect("playlistId pattern is valid")
});

static VID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bvid\s*=\s*["']([^"']+)["']"#).expect("vid pattern is valid")
});

/// Finds `playlistId="..."` and `vid="..."` assignments in the page's script
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternDetailParser;

impl DetailParser for PatternDetailParser {
    fn extract_identifiers(&self, body: &str) -> Result<ItemIdentifiers, &'static str> {
        let capture = |re: &Regex, name: &'static str| {
            re.captures(body)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|id| !id.is_empty())
                .ok_or(name)
        };

        Ok(ItemIdentifiers {
            playlist_id: capture(&PLAYLIST_ID, "playlistId")?,
            vid: capture(&VID, "vid")?,
        })
    }
}
