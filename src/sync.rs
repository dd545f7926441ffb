//! Catalog synchronization.
//!
//! A [`SyncCoordinator`] pulls the `tools`, `prompts` and `resources`
//! collections from a [`CatalogSource`], turns each item into a
//! [`ResourceDescriptor`] and upserts it through the [`ResourceStore`].
//!
//! # Failure handling
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Remote unreachable / credentials rejected | sync aborts with [`SyncError::Unreachable`], nothing written |
//! | One collection fails | logged, treated as empty |
//! | Item is not a valid descriptor | logged, counted as skipped |
//! | Store rejects an item as invalid | logged, counted as skipped |
//! | Store backend failure | sync aborts with [`SyncError::Store`] |

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use ardf_core::descriptor::{CatalogCollection, ResourceDescriptor};
use ardf_core::{ResourceStore, StoreError};

use crate::error::{FetchError, SyncError};

/// A remote catalog that can be pulled one collection at a time.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Stable identifier recorded in the `sources` table.
    fn id(&self) -> &str;

    fn base_url(&self) -> &str;

    /// Display label; the store defaults it to the base URL.
    fn label(&self) -> Option<&str>;

    /// Raw items of one collection.
    async fn fetch(&self, collection: CatalogCollection) -> Result<Vec<Value>, FetchError>;
}

/// Counts reported by one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Items fetched across all collections.
    pub fetched: usize,
    /// Items upserted.
    pub resources_synced: usize,
    /// Items dropped as invalid.
    pub skipped: usize,
}

/// Drives catalog syncs against a shared store.
#[derive(Clone)]
pub struct SyncCoordinator {
    store: Arc<dyn ResourceStore>,
}

impl SyncCoordinator {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Pull every collection from `source` and upsert its items.
    ///
    /// Re-running a sync against an unchanged remote leaves the same rows
    /// (with advanced `updated_at`) and re-records the source.
    pub async fn sync(&self, source: &dyn CatalogSource) -> Result<SyncSummary, SyncError> {
        let mut items = Vec::new();
        for collection in CatalogCollection::ALL {
            match source.fetch(collection).await {
                Ok(batch) => {
                    debug!(
                        source = source.id(),
                        collection = collection.name(),
                        count = batch.len(),
                        "fetched collection"
                    );
                    items.extend(batch);
                }
                Err(FetchError::Unreachable(reason)) => {
                    return Err(SyncError::Unreachable {
                        base_url: source.base_url().to_string(),
                        reason,
                    });
                }
                Err(FetchError::Collection(reason)) => {
                    warn!(
                        source = source.id(),
                        collection = collection.name(),
                        error = %reason,
                        "collection fetch failed; treating as empty"
                    );
                }
            }
        }

        let mut summary = SyncSummary {
            fetched: items.len(),
            ..Default::default()
        };

        for item in &items {
            let descriptor = match ResourceDescriptor::from_value(item) {
                Ok(d) => d,
                Err(e) => {
                    warn!(source = source.id(), error = %e, "skipping catalog item");
                    summary.skipped += 1;
                    continue;
                }
            };

            let resource_id = descriptor.resource_id.clone();
            match self.store.upsert_resource(descriptor.into_input()).await {
                Ok(_) => summary.resources_synced += 1,
                Err(StoreError::Invalid(reason)) => {
                    warn!(
                        source = source.id(),
                        resource_id = %resource_id,
                        error = %reason,
                        "store rejected catalog item"
                    );
                    summary.skipped += 1;
                }
                Err(e) => return Err(SyncError::Store(e)),
            }
        }

        self.store
            .record_source_sync(source.id(), source.base_url(), source.label())
            .await?;

        info!(
            source = source.id(),
            fetched = summary.fetched,
            synced = summary.resources_synced,
            skipped = summary.skipped,
            "catalog sync complete"
        );

        Ok(summary)
    }
}
