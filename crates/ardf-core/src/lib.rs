//! # ARDF Core
//!
//! Shared, I/O-free logic for ARDF Manager: resource models, the error
//! taxonomy, the store abstraction, sync descriptor normalization, the
//! embedding trait and the hybrid ranking algorithm.
//!
//! This crate contains no tokio, sqlx, HTTP client or filesystem
//! dependencies. Concrete persistence and remote embedding providers
//! live in the `ardf-manager` app crate.

pub mod descriptor;
pub mod embedding;
pub mod error;
pub mod models;
pub mod rank;
pub mod store;

pub use embedding::{cosine_similarity, EmbeddingProvider, IdentityProvider};
pub use error::{DescriptorError, ProviderError, StoreError};
pub use models::{Resource, ResourceInput, ResourceStatus, ResourceType, Source};
pub use rank::{Describe, HybridRanker, RankOptions, RankedCandidate};
pub use store::{ListQuery, ResourcePage, ResourceStore};
