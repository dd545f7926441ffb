//! Storage abstraction for ARDF Manager.
//!
//! The [`ResourceStore`] trait defines the persistence contract consumed by
//! the sync pipeline and the recommendation flow, enabling pluggable
//! backends (SQLite in the app crate, [`memory::InMemoryStore`] here).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::StoreError;
use crate::models::{Resource, ResourceInput, Source};

/// Page size used when a listing does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Hard upper bound on a listing page, whatever the caller requests.
pub const MAX_PAGE_SIZE: usize = 100;

/// Filters for [`ResourceStore::list_resources`].
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Exact match on `resource_type`.
    pub resource_type: Option<String>,
    /// Case-insensitive substring match on description, when-to-use, or tags.
    pub query: Option<String>,
    /// Requested page size; see [`ListQuery::effective_limit`].
    pub limit: Option<usize>,
}

impl ListQuery {
    /// Page size after defaulting and clamping to [`MAX_PAGE_SIZE`].
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }

    /// The free-text filter, ignoring blank strings.
    pub fn text(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }
}

/// A page of resources plus the full match count.
#[derive(Debug, Clone, Serialize)]
pub struct ResourcePage {
    pub resources: Vec<Resource>,
    pub total: usize,
}

/// Abstract persistence backend for resources and sources.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_resource`](ResourceStore::upsert_resource) | Insert or replace a resource by `resource_id` |
/// | [`find_by_resource_id`](ResourceStore::find_by_resource_id) | Fetch one resource |
/// | [`list_resources`](ResourceStore::list_resources) | Filtered, recency-ordered page + total |
/// | [`record_source_sync`](ResourceStore::record_source_sync) | Upsert a source row stamped with now |
/// | [`list_sources`](ResourceStore::list_sources) | All sources ordered by label |
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Create or wholesale-replace the resource keyed by `input.resource_id`.
    ///
    /// Keeps `created_at` of an existing row and strictly advances
    /// `updated_at`. Returns the record as stored.
    async fn upsert_resource(&self, input: ResourceInput) -> Result<Resource, StoreError>;

    async fn find_by_resource_id(&self, resource_id: &str)
        -> Result<Option<Resource>, StoreError>;

    /// Resources matching `query`, newest `updated_at` first.
    async fn list_resources(&self, query: &ListQuery) -> Result<ResourcePage, StoreError>;

    /// Record that `source_id` was synced now. `label` defaults to `base_url`.
    async fn record_source_sync(
        &self,
        source_id: &str,
        base_url: &str,
        label: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn list_sources(&self) -> Result<Vec<Source>, StoreError>;
}

/// Next `updated_at` for a row last touched at `previous`.
///
/// Wall-clock time truncated to milliseconds, nudged forward so that two
/// writes in the same millisecond still produce increasing timestamps.
pub fn next_updated_at(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    let now = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}
