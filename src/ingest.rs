//! `ardf sync`: pull a remote catalog into the local store.
//!
//! The target is either the name of a `[sources.<name>]` entry or an
//! ad-hoc base URL. Ad-hoc sources are recorded with the URL as their id.

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::connector_http::HttpCatalogSource;
use crate::sqlite_store::SqliteStore;
use crate::sync::{SyncCoordinator, SyncSummary};

/// Default request timeout for ad-hoc sources.
pub const AD_HOC_TIMEOUT_SECS: u64 = 30;

/// Resolve `target` to a catalog source.
pub fn resolve_source(
    config: &Config,
    target: &str,
    label: Option<String>,
) -> Result<HttpCatalogSource> {
    if let Some(source_config) = config.sources.get(target) {
        let mut source_config = source_config.clone();
        if label.is_some() {
            source_config.label = label;
        }
        return Ok(HttpCatalogSource::from_config(target, &source_config)?);
    }

    if target.starts_with("http://") || target.starts_with("https://") {
        return Ok(HttpCatalogSource::new(
            target,
            label,
            None,
            AD_HOC_TIMEOUT_SECS,
        )?);
    }

    let known: Vec<&str> = config.sources.keys().map(String::as_str).collect();
    bail!(
        "Unknown source '{}'. Configured sources: {}. Pass a URL to sync an ad-hoc catalog.",
        target,
        if known.is_empty() {
            "(none)".to_string()
        } else {
            known.join(", ")
        }
    )
}

/// CLI entry point for `ardf sync`.
pub async fn run_sync(config: &Config, target: &str, label: Option<String>) -> Result<SyncSummary> {
    let source = resolve_source(config, target, label)?;
    let store = SqliteStore::open(config).await?;
    let coordinator = SyncCoordinator::new(Arc::new(store.clone()));

    let result = coordinator.sync(&source).await;
    store.close().await;
    let summary = result?;

    println!("sync {}", target);
    println!("  fetched items: {}", summary.fetched);
    println!("  synced resources: {}", summary.resources_synced);
    println!("  skipped: {}", summary.skipped);
    println!("ok");

    Ok(summary)
}
