//! HTTP catalog connector.
//!
//! Reads a remote MCP-style catalog over plain HTTP:
//!
//! ```text
//! GET {base_url}/tools
//! GET {base_url}/prompts
//! GET {base_url}/resources
//! ```
//!
//! Each endpoint may answer with a bare JSON array or with an object that
//! carries the array under the collection's name (`{"tools": [...]}`).
//! An optional API key is sent as `Authorization: Bearer <key>`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use ardf_core::descriptor::CatalogCollection;

use crate::config::SourceConfig;
use crate::error::{ConfigurationError, FetchError};
use crate::sync::CatalogSource;

/// A remote catalog reached over HTTP.
#[derive(Debug)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    id: String,
    base_url: String,
    label: Option<String>,
    api_key: Option<String>,
}

impl HttpCatalogSource {
    /// An ad-hoc source, identified by its base URL.
    pub fn new(
        base_url: &str,
        label: Option<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ConfigurationError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ConfigurationError::invalid("base_url must not be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ConfigurationError::invalid(format!("catalog HTTP client: {}", e)))?;

        Ok(Self {
            client,
            id: base_url.clone(),
            base_url,
            label: label.filter(|l| !l.trim().is_empty()),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// A source from `[sources.<name>]`, identified by `name`.
    pub fn from_config(name: &str, config: &SourceConfig) -> Result<Self, ConfigurationError> {
        let mut source = Self::new(
            &config.base_url,
            config.label.clone(),
            config.api_key.clone(),
            config.timeout_secs,
        )?;
        source.id = name.to_string();
        Ok(source)
    }

    fn collection_url(&self, collection: CatalogCollection) -> String {
        format!("{}/{}", self.base_url, collection.name())
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    async fn fetch(&self, collection: CatalogCollection) -> Result<Vec<Value>, FetchError> {
        let url = self.collection_url(collection);
        debug!(url = %url, "fetching catalog collection");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        // Connection refused, DNS failure and timeouts all surface here.
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unreachable(format!("{} returned {}", url, status)));
        }
        if !status.is_success() {
            return Err(FetchError::Collection(format!("{} returned {}", url, status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Collection(format!("{}: invalid JSON: {}", url, e)))?;

        collection
            .items_from_body(body)
            .ok_or_else(|| FetchError::Collection(format!("{}: unexpected response shape", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ad_hoc_source_is_identified_by_url() {
        let source = HttpCatalogSource::new("https://mcp.example.com/", None, None, 30).unwrap();
        assert_eq!(source.id(), "https://mcp.example.com");
        assert_eq!(source.base_url(), "https://mcp.example.com");
        assert!(source.label().is_none());
        assert_eq!(
            source.collection_url(CatalogCollection::Prompts),
            "https://mcp.example.com/prompts"
        );
    }

    #[test]
    fn test_configured_source_uses_name() {
        let config = SourceConfig {
            base_url: "https://mcp.example.com".to_string(),
            label: Some("Primary".to_string()),
            api_key: None,
            timeout_secs: 5,
        };
        let source = HttpCatalogSource::from_config("primary", &config).unwrap();
        assert_eq!(source.id(), "primary");
        assert_eq!(source.label(), Some("Primary"));
    }

    #[test]
    fn test_rejects_empty_base_url() {
        assert!(HttpCatalogSource::new("  ", None, None, 30).is_err());
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // Port 9 (discard) is closed on test hosts.
        let source = HttpCatalogSource::new("http://127.0.0.1:9", None, None, 5).unwrap();
        let err = source.fetch(CatalogCollection::Tools).await.unwrap_err();
        assert!(matches!(err, FetchError::Unreachable(_)));
    }
}
