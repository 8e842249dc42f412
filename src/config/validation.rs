use crate::config::types::{Config, CrawlDefaults, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};
use crate::url::PageUrlCodec;
use crate::ConfigError;
use encoding_rs::Encoding;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_site_config(&config.site)?;
    validate_crawl_defaults(&config.crawl)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.worker_count < 1 || config.worker_count > 100 {
        return Err(ConfigError::Validation(format!(
            "worker_count must be between 1 and 100, got {}",
            config.worker_count
        )));
    }

    if config.items_per_page < 1 {
        return Err(ConfigError::Validation(format!(
            "items_per_page must be >= 1, got {}",
            config.items_per_page
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1s, got {}s",
            config.request_timeout
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates site markup and endpoint settings
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.page_marker.is_empty() {
        return Err(ConfigError::Validation(
            "page_marker cannot be empty".to_string(),
        ));
    }

    PageUrlCodec::new(&config.page_marker, &config.page_suffix)
        .map_err(|e| ConfigError::Validation(format!("Invalid page_suffix: {}", e)))?;

    if config.detail_encoding.trim().is_empty() {
        return Err(ConfigError::Validation(
            "detail_encoding cannot be empty".to_string(),
        ));
    }

    if Encoding::for_label(config.detail_encoding.trim().as_bytes()).is_none() {
        return Err(ConfigError::Validation(format!(
            "Unknown detail_encoding: {}",
            config.detail_encoding
        )));
    }

    for (name, selector) in [
        ("item_selector", &config.item_selector),
        ("next_page_selector", &config.next_page_selector),
        ("last_page_selector", &config.last_page_selector),
    ] {
        Selector::parse(selector)
            .map_err(|_| ConfigError::InvalidSelector(format!("{} = '{}'", name, selector)))?;
    }

    validate_http_url("metadata_url", &config.metadata_url)?;
    validate_http_url("vote_url", &config.vote_url)?;

    Ok(())
}

/// Validates the optional crawl defaults
fn validate_crawl_defaults(config: &CrawlDefaults) -> Result<(), ConfigError> {
    if let Some(start_url) = &config.start_url {
        validate_http_url("start_url", start_url)?;
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.snapshot_path.is_empty() {
        return Err(ConfigError::Validation(
            "snapshot_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a setting holds an absolute HTTP(S) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}
