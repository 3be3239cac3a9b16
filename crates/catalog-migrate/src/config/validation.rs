//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};
use url::Url;

/// Largest page the WooCommerce REST API will serve.
const MAX_PAGE_SIZE: u32 = 100;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.url.trim().is_empty() {
        return Err(MigrateError::Config("source.url is required".into()));
    }
    match Url::parse(config.source.url.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => {
            return Err(MigrateError::Config(format!(
                "source.url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        Err(e) => {
            return Err(MigrateError::Config(format!("source.url is invalid: {}", e)));
        }
    }
    if config.source.consumer_key.is_empty() {
        return Err(MigrateError::Config("source.consumer_key is required".into()));
    }
    if config.source.consumer_secret.is_empty() {
        return Err(MigrateError::Config(
            "source.consumer_secret is required".into(),
        ));
    }

    // Target validation
    if config.target.shop.trim().is_empty() {
        return Err(MigrateError::Config("target.shop is required".into()));
    }
    if config.target.access_token.is_empty() {
        return Err(MigrateError::Config("target.access_token is required".into()));
    }

    // Migration config validation
    if config.migration.page_size == 0 || config.migration.page_size > MAX_PAGE_SIZE {
        return Err(MigrateError::Config(format!(
            "migration.page_size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, config.migration.page_size
        )));
    }
    if config.migration.search_limit == 0 {
        return Err(MigrateError::Config(
            "migration.search_limit must be at least 1".into(),
        ));
    }

    Ok(())
}
