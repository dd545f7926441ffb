use anyhow::Result;

use ardf_core::{ResourceStore, Source};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// One row of `ardf sources`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatus {
    pub id: String,
    pub base_url: String,
    pub label: String,
    pub configured: bool,
    pub last_sync: Option<String>,
}

/// Configured sources first (in name order), then recorded ad-hoc sources.
pub fn merge_sources(config: &Config, recorded: &[Source]) -> Vec<SourceStatus> {
    let format_sync = |s: &Source| {
        s.last_sync_at
            .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    };

    let mut rows: Vec<SourceStatus> = config
        .sources
        .iter()
        .map(|(name, cfg)| {
            let seen = recorded.iter().find(|s| &s.id == name);
            SourceStatus {
                id: name.clone(),
                base_url: cfg.base_url.clone(),
                label: cfg.label.clone().unwrap_or_else(|| cfg.base_url.clone()),
                configured: true,
                last_sync: seen.and_then(format_sync),
            }
        })
        .collect();

    rows.extend(
        recorded
            .iter()
            .filter(|s| !config.sources.contains_key(&s.id))
            .map(|s| SourceStatus {
                id: s.id.clone(),
                base_url: s.base_url.clone(),
                label: s.label.clone(),
                configured: false,
                last_sync: format_sync(s),
            }),
    );

    rows
}

pub async fn list_sources(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let recorded = store.list_sources().await?;
    store.close().await;

    let rows = merge_sources(config, &recorded);
    if rows.is_empty() {
        println!("No sources configured or synced.");
        return Ok(());
    }

    println!(
        "{:<24} {:<12} {:<22} {:<24} BASE_URL",
        "SOURCE", "KIND", "LAST_SYNC", "LABEL"
    );
    for row in rows {
        println!(
            "{:<24} {:<12} {:<22} {:<24} {}",
            row.id,
            if row.configured { "configured" } else { "ad-hoc" },
            row.last_sync.as_deref().unwrap_or("never"),
            row.label,
            row.base_url
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use chrono::Utc;

    #[test]
    fn test_merge_configured_and_recorded() {
        let mut config = Config::minimal();
        config.sources.insert(
            "primary".to_string(),
            SourceConfig {
                base_url: "https://a.example".to_string(),
                label: None,
                api_key: None,
                timeout_secs: 30,
            },
        );
        config.sources.insert(
            "secondary".to_string(),
            SourceConfig {
                base_url: "https://c.example".to_string(),
                label: Some("Secondary".to_string()),
                api_key: None,
                timeout_secs: 30,
            },
        );
        let recorded = vec![
            Source {
                id: "https://b.example".to_string(),
                base_url: "https://b.example".to_string(),
                label: "https://b.example".to_string(),
                last_sync_at: Some(Utc::now()),
            },
            Source {
                id: "primary".to_string(),
                base_url: "https://a.example".to_string(),
                label: "https://a.example".to_string(),
                last_sync_at: Some(Utc::now()),
            },
        ];

        let rows = merge_sources(&config, &recorded);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, "primary");
        assert!(rows[0].last_sync.is_some());
        assert_eq!(rows[1].label, "Secondary");
        assert!(rows[1].last_sync.is_none());
        assert_eq!(rows[2].id, "https://b.example");
        assert!(!rows[2].configured);
    }
}
