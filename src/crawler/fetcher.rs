//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester:
//! - Building the HTTP client with a proper user agent string
//! - GET requests for listing pages, detail pages and the JSON endpoints
//! - Error classification into status and network failures

use crate::config::UserAgentConfig;
use encoding_rs::{Encoding, UTF_8};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// A failed request: either the server answered with something other than
/// 200, or the request never produced a usable body
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. } | Self::Network { url, .. } => url,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Upper bound for a whole request
///
/// # Example
///
/// ```no_run
/// use reel_harvest::config::UserAgentConfig;
/// use reel_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "ReelHarvest".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL)
    let user_agent = format!(
        "{}/{} (+{})",
        config.crawler_name, config.crawler_version, config.contact_url
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches `url` and returns its body as text
///
/// Only HTTP 200 counts as success. `charset` forces the body's decoding,
/// overriding whatever the response declares (detail pages are served in a
/// regional encoding). None follows the response headers, defaulting to UTF-8.
pub async fn fetch_text(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
    charset: Option<&str>,
) -> Result<String, FetchError> {
    let network = |source: reqwest::Error| FetchError::Network {
        url: url.to_string(),
        source,
    };

    let mut request = client.get(url);
    if !query.is_empty() {
        request = request.query(query);
    }

    let response = request.send().await.map_err(network)?;
    let status = response.status();

    if status != StatusCode::OK {
        return Err(FetchError::Status {
            url: response.url().to_string(),
            status: status.as_u16(),
        });
    }

    let Some(label) = charset else {
        return response.text().await.map_err(network);
    };

    let encoding = Encoding::for_label(label.trim().as_bytes()).unwrap_or_else(|| {
        warn!("Unknown charset '{}' for {}; decoding as UTF-8", label, url);
        UTF_8
    });
    let bytes = response.bytes().await.map_err(network)?;
    let (text, _, _) = encoding.decode(&bytes);
    Ok(text.into_owned())
}
