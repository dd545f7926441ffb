//! In-memory [`ResourceStore`] implementation for testing and embedding.
//!
//! Uses `HashMap` behind `std::sync::RwLock` for thread safety. Listing is
//! a linear scan with the same filter and ordering rules as the SQLite
//! backend.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{Resource, ResourceInput, Source};

use super::{next_updated_at, ListQuery, ResourcePage, ResourceStore};

#[derive(Default)]
struct Catalog {
    rows: HashMap<String, Resource>,
    /// Latest `updated_at` handed out, so recency order follows write order.
    last_write: Option<DateTime<Utc>>,
}

/// In-memory store for tests and single-process use.
pub struct InMemoryStore {
    resources: RwLock<Catalog>,
    sources: RwLock<HashMap<String, Source>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(Catalog::default()),
            sources: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::backend("in-memory store lock poisoned")
}

fn matches_text(resource: &Resource, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    resource.description.to_lowercase().contains(&needle)
        || resource
            .when_to_use
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
            .contains(&needle)
        || resource.tags_text().to_lowercase().contains(&needle)
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn upsert_resource(&self, input: ResourceInput) -> Result<Resource, StoreError> {
        let input = input.normalize()?;
        let mut catalog = self.resources.write().map_err(poisoned)?;

        let updated_at = next_updated_at(catalog.last_write);
        let created_at = catalog
            .rows
            .get(&input.resource_id)
            .map(|r| r.created_at)
            .unwrap_or(updated_at);

        let resource = Resource::from_input(input, created_at, updated_at);
        catalog.last_write = Some(updated_at);
        catalog
            .rows
            .insert(resource.resource_id.clone(), resource.clone());
        Ok(resource)
    }

    async fn find_by_resource_id(
        &self,
        resource_id: &str,
    ) -> Result<Option<Resource>, StoreError> {
        let catalog = self.resources.read().map_err(poisoned)?;
        Ok(catalog.rows.get(resource_id).cloned())
    }

    async fn list_resources(&self, query: &ListQuery) -> Result<ResourcePage, StoreError> {
        let catalog = self.resources.read().map_err(poisoned)?;

        let mut matching: Vec<&Resource> = catalog
            .rows
            .values()
            .filter(|r| {
                query
                    .resource_type
                    .as_deref()
                    .map_or(true, |t| r.resource_type.as_str() == t)
            })
            .filter(|r| query.text().map_or(true, |q| matches_text(r, q)))
            .collect();

        matching.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.resource_id.cmp(&b.resource_id))
        });

        let total = matching.len();
        let resources = matching
            .into_iter()
            .take(query.effective_limit())
            .cloned()
            .collect();

        Ok(ResourcePage { resources, total })
    }

    async fn record_source_sync(
        &self,
        source_id: &str,
        base_url: &str,
        label: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut sources = self.sources.write().map_err(poisoned)?;
        sources.insert(
            source_id.to_string(),
            Source {
                id: source_id.to_string(),
                base_url: base_url.to_string(),
                label: label.unwrap_or(base_url).to_string(),
                last_sync_at: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        let sources = self.sources.read().map_err(poisoned)?;
        let mut out: Vec<Source> = sources.values().cloned().collect();
        out.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }
}
