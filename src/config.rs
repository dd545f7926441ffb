//! TOML configuration parsing and validation.
//!
//! Only `[db]` is required; every other section has defaults. The
//! `[embedding]` section can additionally be overridden from `ARDF_EMBEDDING_*`
//! environment variables, which take precedence over the file.
//!
//! ```toml
//! [db]
//! path = "./data/ardf.sqlite"
//!
//! [ranking]
//! alpha = 0.6
//! limit = 10
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//!
//! [sources.primary]
//! base_url = "https://mcp.example.com"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Named remote catalogs, synced with `ardf sync <name>`.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

impl Config {
    /// Every section at its default, with the database at `./data/ardf.sqlite`.
    ///
    /// Used to build state in code that has no config file to read.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/ardf.sqlite"),
            },
            ranking: RankingConfig::default(),
            embedding: EmbeddingConfig::default(),
            server: ServerConfig::default(),
            sources: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    /// Semantic weight in `[0, 1]`.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Candidates requested from the store before ranking.
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            limit: default_limit(),
            candidate_pool: default_candidate_pool(),
        }
    }
}

fn default_alpha() -> f64 {
    ardf_core::rank::DEFAULT_ALPHA
}
fn default_limit() -> usize {
    ardf_core::rank::DEFAULT_LIMIT
}
fn default_candidate_pool() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `identity`, `openai`, `openai-compatible` or `remote`. When unset the
    /// provider is inferred from the remote settings below.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default = "default_fallback_to_identity")]
    pub fallback_to_identity: bool,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    /// Extra headers sent with every embedding request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: None,
            fallback_to_identity: default_fallback_to_identity(),
            api_url: None,
            api_key: None,
            model: None,
            organization: None,
            headers: BTreeMap::new(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

fn default_fallback_to_identity() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    /// Whether any setting that only makes sense for a remote provider is present.
    pub fn has_remote_settings(&self) -> bool {
        self.api_url.is_some()
            || self.api_key.is_some()
            || self.model.is_some()
            || self.organization.is_some()
    }

    /// Apply `ARDF_EMBEDDING_*` overrides read through `lookup`.
    ///
    /// Empty values are ignored. `ARDF_EMBEDDING_API_HEADERS` is merged
    /// into [`headers`](Self::headers), replacing entries with the same name.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ARDF_EMBEDDING_PROVIDER") {
            self.provider = Some(v);
        }
        if let Some(v) = get("ARDF_EMBEDDING_API_URL") {
            self.api_url = Some(v);
        }
        if let Some(v) = get("ARDF_EMBEDDING_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = get("ARDF_EMBEDDING_MODEL") {
            self.model = Some(v);
        }
        if let Some(v) = get("ARDF_EMBEDDING_ORG") {
            self.organization = Some(v);
        }
        if let Some(extra) = get("ARDF_EMBEDDING_API_HEADERS").and_then(|v| parse_additional_headers(&v)) {
            self.headers.extend(extra);
        }
    }
}

/// Parse a JSON object of extra headers.
///
/// String, number and boolean values become header strings; other values
/// are dropped. Invalid JSON or a non-object is logged and ignored.
pub fn parse_additional_headers(raw: &str) -> Option<BTreeMap<String, String>> {
    let parsed: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "failed to parse ARDF_EMBEDDING_API_HEADERS; ignoring value");
            return None;
        }
    };

    let Some(object) = parsed.as_object() else {
        warn!("ARDF_EMBEDDING_API_HEADERS is not a JSON object; ignoring value");
        return None;
    };

    let headers = object
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.clone(), value))
        })
        .collect();

    Some(headers)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:4000".to_string()
}

/// A named remote catalog.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Read, parse and validate the config file, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.embedding.apply_env(|key| std::env::var(key).ok());
    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if !(0.0..=1.0).contains(&config.ranking.alpha) {
        anyhow::bail!("ranking.alpha must be in [0.0, 1.0]");
    }

    if config.ranking.limit < 1 {
        anyhow::bail!("ranking.limit must be >= 1");
    }

    if config.ranking.candidate_pool < 1 {
        anyhow::bail!("ranking.candidate_pool must be >= 1");
    }

    if config.embedding.timeout_secs == 0 {
        anyhow::bail!("embedding.timeout_secs must be > 0");
    }

    for (name, source) in &config.sources {
        if source.base_url.trim().is_empty() {
            anyhow::bail!("sources.{}.base_url must not be empty", name);
        }
    }

    Ok(())
}
