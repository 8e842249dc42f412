//! Reel-Harvest: a paginated catalog harvester
//!
//! This crate walks a page-numbered listing, collects the item detail links it
//! exposes, then enriches every item from the site's metadata and engagement
//! endpoints and stores one normalized record per item. Interrupted runs leave a
//! snapshot of unclaimed work that the next run can resume from.

pub mod config;
pub mod crawler;
pub mod output;
pub mod queue;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Reel-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Page URL error: {0}")]
    PageUrl(#[from] PageUrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No start URL given (use --url or set crawl.start-url)")]
    MissingStartUrl,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector in config: {0}")]
    InvalidSelector(String),
}

/// Errors from decomposing a listing URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageUrlError {
    /// The URL does not carry a page number in the expected template.
    /// Callers treat this as "no discoverable pagination".
    #[error("URL is not paginated: {0}")]
    NotPaginated(String),
}

/// Errors from the pending-queue snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("No queue snapshot at {0}")]
    NotFound(PathBuf),

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Reel-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlRequest, ResumeMode, RunSummary};
pub use storage::EnrichedRecord;
pub use url::{PageUrl, PageUrlCodec};
