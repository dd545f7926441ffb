//! Error taxonomy shared by the store, the sync pipeline and the
//! embedding providers.

use thiserror::Error;

/// Failure of an embedding call.
///
/// Never surfaced to callers of [`HybridRanker::rank`](crate::rank::HybridRanker::rank),
/// which degrades to lexical-only scoring instead.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("malformed embedding response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Whether a retry could plausibly succeed (network errors, HTTP 429, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::CountMismatch { .. } | Self::Malformed(_) => false,
        }
    }
}

/// Failure of a persistence operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid resource: {0}")]
    Invalid(String),

    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// A remote sync item that cannot be turned into a resource.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("descriptor is not a JSON object")]
    NotAnObject,

    #[error("descriptor is missing `{0}`")]
    MissingField(&'static str),
}
