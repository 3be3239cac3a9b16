//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source store configuration (WooCommerce REST).
    pub source: SourceConfig,

    /// Destination store configuration (Shopify Admin GraphQL).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source store (WooCommerce) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Store base URL, e.g. `https://shop.example.com`.
    pub url: String,

    /// REST API consumer key. Required, no default.
    #[serde(default)]
    pub consumer_key: String,

    /// REST API consumer secret. Required, no default.
    #[serde(default)]
    pub consumer_secret: String,

    /// REST API version (default: "v3").
    #[serde(default = "default_wc_version")]
    pub api_version: String,

    /// Send credentials as query parameters instead of basic auth (default: true).
    #[serde(default = "default_true")]
    pub query_string_auth: bool,

    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Destination store (Shopify) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Shop domain, e.g. `example.myshopify.com`.
    pub shop: String,

    /// Admin API access token. Required, no default.
    #[serde(default)]
    pub access_token: String,

    /// Admin API version (default: "2024-10").
    #[serde(default = "default_admin_version")]
    pub api_version: String,

    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Records requested per source page (default: 50).
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Candidates requested per destination title search (default: 5).
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            search_limit: default_search_limit(),
        }
    }
}

const REDACTED: &str = "[REDACTED]";

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("url", &self.url)
            .field("consumer_key", &REDACTED)
            .field("consumer_secret", &REDACTED)
            .field("api_version", &self.api_version)
            .field("query_string_auth", &self.query_string_auth)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("shop", &self.shop)
            .field("access_token", &REDACTED)
            .field("api_version", &self.api_version)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

// Default value functions for serde
fn default_wc_version() -> String {
    "v3".to_string()
}

fn default_admin_version() -> String {
    "2024-10".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_page_size() -> u32 {
    50
}

fn default_search_limit() -> u32 {
    5
}

fn default_true() -> bool {
    true
}
