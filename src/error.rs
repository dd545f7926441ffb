//! Application-level error types.
//!
//! Library-facing failures that callers are expected to match on. Command
//! code wraps these in `anyhow` with context.

use ardf_core::StoreError;
use thiserror::Error;

/// Invalid or unsupported configuration. Fatal at construction time.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unsupported embedding provider '{name}'; expected one of: {supported}")]
    UnsupportedProvider {
        name: String,
        supported: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigurationError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Failure to fetch one collection from a remote catalog.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote is not reachable or rejects our credentials; no other
    /// collection will fare better.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// This collection failed (missing endpoint, server error, bad body).
    #[error("{0}")]
    Collection(String),
}

/// Failure of a catalog sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote catalog could not be reached at all (connection, DNS,
    /// timeout, or rejected credentials).
    #[error("catalog source {base_url} is unreachable: {reason}")]
    Unreachable { base_url: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
