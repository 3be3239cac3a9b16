//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::Path;
use url::Url;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config = Self::from_yaml_unvalidated(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without validating; callers must call [`Config::validate`] themselves.
    pub fn from_yaml_unvalidated(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl SourceConfig {
    /// Products listing endpoint, e.g. `https://shop/wp-json/wc/v3/products`.
    pub fn products_endpoint(&self) -> Result<Url> {
        let base = self.url.trim_end_matches('/');
        let raw = format!("{}/wp-json/wc/{}/products", base, self.api_version);
        Url::parse(&raw)
            .map_err(|e| MigrateError::Config(format!("invalid source.url {:?}: {}", self.url, e)))
    }
}

impl TargetConfig {
    /// Admin GraphQL endpoint for the configured shop.
    pub fn graphql_endpoint(&self) -> Result<Url> {
        let shop = self
            .shop
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let raw = format!("https://{}/admin/api/{}/graphql.json", shop, self.api_version);
        Url::parse(&raw)
            .map_err(|e| MigrateError::Config(format!("invalid target.shop {:?}: {}", self.shop, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
source:
  url: https://shop.example.com/
  consumer_key: ck_test
  consumer_secret: cs_test
target:
  shop: example.myshopify.com
  access_token: shpat_test
"#;

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.source.api_version, "v3");
        assert!(config.source.query_string_auth);
        assert_eq!(config.source.timeout_seconds, 30);
        assert_eq!(config.target.api_version, "2024-10");
        assert_eq!(config.migration.page_size, 50);
        assert_eq!(config.migration.search_limit, 5);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.target.shop, "example.myshopify.com");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let yaml = r#"
source:
  url: https://shop.example.com
target:
  shop: example.myshopify.com
  access_token: shpat_test
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("consumer_key"));
    }

    #[test]
    fn test_products_endpoint_strips_trailing_slash() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        let url = config.source.products_endpoint().unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/wp-json/wc/v3/products");
    }

    #[test]
    fn test_graphql_endpoint() {
        let mut config = Config::from_yaml(MINIMAL).unwrap();
        config.target.shop = "https://example.myshopify.com/".to_string();
        let url = config.target.graphql_endpoint().unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.myshopify.com/admin/api/2024-10/graphql.json"
        );
    }
}
