//! Single-resource commands: `ardf get` and `ardf add`.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

use ardf_core::{ResourceInput, ResourceStore};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// CLI entry point for `ardf get`: print the resource as JSON.
pub async fn run_get(config: &Config, resource_id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let resource = store.find_by_resource_id(resource_id).await?;
    store.close().await;

    match resource {
        Some(r) => {
            println!("{}", serde_json::to_string_pretty(&r)?);
            Ok(())
        }
        None => bail!("resource not found: {}", resource_id),
    }
}

/// Parse a resource file holding one object or an array of objects.
pub fn parse_resource_file(content: &str) -> Result<Vec<ResourceInput>> {
    let value: Value = serde_json::from_str(content).context("resource file is not valid JSON")?;
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).with_context(|| format!("resource #{} is invalid", i + 1))
        })
        .collect()
}

/// CLI entry point for `ardf add`: upsert locally authored resources.
///
/// Missing `status` and `version` default to `draft` and `1.0.0`.
pub async fn run_add(config: &Config, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read resource file: {}", path.display()))?;
    let inputs = parse_resource_file(&content)?;

    let store = SqliteStore::open(config).await?;
    let mut count = 0;
    for input in inputs {
        let stored = store.upsert_resource(input).await?;
        println!(
            "upserted {} ({}, {}, v{})",
            stored.resource_id, stored.resource_type, stored.status, stored.version
        );
        count += 1;
    }
    store.close().await;

    println!("ok: {} resource(s)", count);
    Ok(())
}
