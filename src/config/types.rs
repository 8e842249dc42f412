use crate::url::{DEFAULT_PAGE_MARKER, DEFAULT_PAGE_SUFFIX};
use serde::Deserialize;

/// Main configuration structure for Reel-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub crawl: CrawlDefaults,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers in each pool
    #[serde(rename = "worker-count")]
    pub worker_count: u32,

    /// Items shown on one listing page
    #[serde(rename = "items-per-page", default = "default_items_per_page")]
    pub items_per_page: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Enables debug-level logging
    #[serde(default)]
    pub debug: bool,
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
}

/// Markup and endpoint layout of the harvested site
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SiteConfig {
    /// Literal token immediately preceding the page number in listing URLs
    pub page_marker: String,

    /// Pattern matching everything after the page number
    pub page_suffix: String,

    /// Selector matching one item card on a listing page
    pub item_selector: String,

    /// Selector matching the "next page" control
    pub next_page_selector: String,

    /// Selector matching the page-number widget entries (last entry = last page)
    pub last_page_selector: String,

    /// Charset used to decode item detail pages
    pub detail_encoding: String,

    /// Metadata endpoint, queried with `playlistid` and `vid`
    pub metadata_url: String,

    /// Engagement endpoint, queried with `vid` and `type`
    pub vote_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            page_marker: DEFAULT_PAGE_MARKER.to_string(),
            page_suffix: DEFAULT_PAGE_SUFFIX.to_string(),
            item_selector: "div.info".to_string(),
            next_page_selector: "a.next".to_string(),
            last_page_selector: "div.num a".to_string(),
            detail_encoding: "gbk".to_string(),
            metadata_url: "http://pl.hd.sohu.com/videolist".to_string(),
            vote_url: "http://score.my.tv.sohu.com/digg/get.do".to_string(),
        }
    }
}

/// Defaults for a crawl request; the command line overrides both
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlDefaults {
    #[serde(rename = "start-url")]
    pub start_url: Option<String>,

    /// Maximum number of items to harvest (0 = unbounded)
    #[serde(default)]
    pub limit: usize,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path of the pending-queue snapshot written on interruption
    #[serde(rename = "snapshot-path", default = "default_snapshot_path")]
    pub snapshot_path: String,
}

fn default_items_per_page() -> u32 {
    20
}

fn default_request_timeout() -> u64 {
    30
}

fn default_snapshot_path() -> String {
    "./queue.snapshot.json".to_string()
}
