//! Embedding providers backed by configuration.
//!
//! The core crate defines the [`EmbeddingProvider`] trait and the offline
//! [`IdentityProvider`]. This module adds:
//! - **[`OpenAiCompatibleProvider`]**: calls `POST {api_url}/embeddings` on
//!   any OpenAI-compatible endpoint.
//! - **[`Embedder`]**: the closed set of providers the app can run with.
//! - **[`create_provider`]**: picks an [`Embedder`] from [`EmbeddingConfig`].
//!
//! # Provider Selection
//!
//! ```rust
//! # use ardf_manager::config::EmbeddingConfig;
//! # use ardf_manager::embedding::create_provider;
//! # use ardf_core::EmbeddingProvider;
//! let config = EmbeddingConfig::default(); // no provider, no remote settings
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.name(), "identity");
//! ```
//!
//! # Retry Strategy
//!
//! Retries are off by default (`embedding.max_retries = 0`). When enabled:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use ardf_core::{EmbeddingProvider, IdentityProvider, ProviderError};

use crate::config::EmbeddingConfig;
use crate::error::ConfigurationError;

/// Endpoint used when `embedding.api_url` is not set.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// Model used when `embedding.model` is not set.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

const SUPPORTED_PROVIDERS: &str = "identity, openai, openai-compatible, remote";

// ============ Retry ============

/// Exponential-backoff retry for transient provider errors.
///
/// Non-transient errors and the error of the final attempt are returned
/// unchanged.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << (attempt.saturating_sub(1)).min(5))
    }

    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay(attempt);
                    warn!(
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "retrying embedding request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(0)
    }
}

// ============ OpenAI-compatible provider ============

/// Provider for any endpoint that speaks the OpenAI embeddings protocol.
///
/// Sends `{model, input}` in a single request per [`embed`](EmbeddingProvider::embed)
/// call and accepts `data` entries that are either bare numeric arrays or
/// objects with an `embedding` array.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    headers: HeaderMap,
    retry: RetryPolicy,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Invalid`] for header names or values
    /// that are not valid HTTP, or if the HTTP client cannot be built.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigurationError> {
        let api_url = config.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL).to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", key))?);
        }
        if let Some(org) = &config.organization {
            headers.insert(HeaderName::from_static("openai-organization"), header_value(org)?);
        }
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ConfigurationError::invalid(format!("embedding header name '{}': {}", name, e))
            })?;
            headers.insert(name, header_value(value)?);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigurationError::invalid(format!("embedding HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", api_url.trim_end_matches('/')),
            model,
            headers,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    /// Override the retry policy (tests use a short base delay).
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        debug!(endpoint = %self.endpoint, count = texts.len(), "requesting embeddings");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(e.to_string()))?;

        parse_embeddings(&json, texts.len())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.retry.run(|| self.request(texts)).await
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ConfigurationError> {
    HeaderValue::from_str(value)
        .map_err(|e| ConfigurationError::invalid(format!("embedding header value: {}", e)))
}

/// Parse an embeddings response body into `expected` vectors.
///
/// Requires a `data` array of exactly `expected` entries; each entry is a
/// numeric array or an object holding one under `embedding`.
pub fn parse_embeddings(json: &Value, expected: usize) -> Result<Vec<Vec<f32>>, ProviderError> {
    let data = json
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::malformed("missing data array"))?;

    if data.len() != expected {
        return Err(ProviderError::CountMismatch {
            expected,
            actual: data.len(),
        });
    }

    data.iter()
        .enumerate()
        .map(|(i, entry)| -> Result<Vec<f32>, ProviderError> {
            let values = match entry {
                Value::Array(values) => values,
                Value::Object(obj) => obj
                    .get("embedding")
                    .and_then(Value::as_array)
                    .ok_or_else(|| ProviderError::malformed(format!("entry {} has no embedding", i)))?,
                _ => {
                    return Err(ProviderError::malformed(format!(
                        "entry {} is neither an array nor an object",
                        i
                    )))
                }
            };
            values
                .iter()
                .map(|v| {
                    v.as_f64().map(|f| f as f32).ok_or_else(|| {
                        ProviderError::malformed(format!("entry {} has a non-numeric component", i))
                    })
                })
                .collect()
        })
        .collect()
}

// ============ Provider selection ============

/// The embedding providers the application can be configured with.
pub enum Embedder {
    Identity(IdentityProvider),
    OpenAiCompatible(OpenAiCompatibleProvider),
}

#[async_trait]
impl EmbeddingProvider for Embedder {
    fn name(&self) -> &str {
        match self {
            Embedder::Identity(p) => p.name(),
            Embedder::OpenAiCompatible(p) => p.name(),
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        match self {
            Embedder::Identity(p) => p.embed(texts).await,
            Embedder::OpenAiCompatible(p) => p.embed(texts).await,
        }
    }
}

/// Create the [`Embedder`] described by `config`.
///
/// # Supported Providers
///
/// | `provider` | Result |
/// |-----------|--------|
/// | `identity` | [`IdentityProvider`] |
/// | `openai`, `openai-compatible`, `remote` | [`OpenAiCompatibleProvider`] |
/// | unset, with `api_url`/`api_key`/`model`/`organization` | [`OpenAiCompatibleProvider`] |
/// | unset, nothing else | [`IdentityProvider`] |
/// | anything else | [`IdentityProvider`] if `fallback_to_identity`, otherwise an error |
///
/// Names are case-insensitive.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Embedder, ConfigurationError> {
    let name = config
        .provider
        .as_deref()
        .map(|p| p.trim().to_ascii_lowercase())
        .filter(|p| !p.is_empty());

    match name.as_deref() {
        Some("identity") => Ok(Embedder::Identity(IdentityProvider)),
        Some("openai" | "openai-compatible" | "remote") => {
            Ok(Embedder::OpenAiCompatible(OpenAiCompatibleProvider::new(config)?))
        }
        None if config.has_remote_settings() => {
            Ok(Embedder::OpenAiCompatible(OpenAiCompatibleProvider::new(config)?))
        }
        None => Ok(Embedder::Identity(IdentityProvider)),
        Some(other) if config.fallback_to_identity => {
            warn!(
                provider = other,
                "unsupported embedding provider; falling back to identity"
            );
            Ok(Embedder::Identity(IdentityProvider))
        }
        Some(other) => Err(ConfigurationError::UnsupportedProvider {
            name: other.to_string(),
            supported: SUPPORTED_PROVIDERS,
        }),
    }
}
