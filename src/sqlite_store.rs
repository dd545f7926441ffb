//! SQLite-backed [`ResourceStore`].
//!
//! Resources are keyed by `resource_id` and written with
//! `INSERT .. ON CONFLICT DO UPDATE`, so an upsert replaces every mutable
//! column and keeps `created_at`. JSON-valued fields are stored as text.
//! Timestamps are Unix milliseconds.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use ardf_core::models::serialize_tags;
use ardf_core::store::next_updated_at;
use ardf_core::{
    ListQuery, Resource, ResourceInput, ResourcePage, ResourceStore, Source, StoreError,
};

use crate::config::Config;
use crate::db;
use crate::migrate;

const RESOURCE_COLUMNS: &str = "resource_id, resource_type, description, when_to_use, \
    metadata_json, content_json, tags_json, domain, status, version, created_at, updated_at";

/// SQLite implementation of [`ResourceStore`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ResourceStore for SqliteStore {
    async fn upsert_resource(&self, input: ResourceInput) -> Result<Resource, StoreError> {
        let input = input.normalize()?;
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let now = next_updated_at(None);
        let resource = Resource::from_input(input, now, now);

        // Stamp = MAX(now, high-water mark + 1), read inside the write so the
        // statement holds the write lock before it looks at other rows.
        sqlx::query(
            r#"
            INSERT INTO resources (resource_id, resource_type, description, when_to_use,
                metadata_json, content_json, tags_json, domain, status, version,
                created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, stamp, stamp
            FROM (SELECT MAX(?, (SELECT IFNULL(MAX(updated_at), 0) + 1 FROM resources)) AS stamp)
            WHERE 1
            ON CONFLICT(resource_id) DO UPDATE SET
                resource_type = excluded.resource_type,
                description = excluded.description,
                when_to_use = excluded.when_to_use,
                metadata_json = excluded.metadata_json,
                content_json = excluded.content_json,
                tags_json = excluded.tags_json,
                domain = excluded.domain,
                status = excluded.status,
                version = excluded.version,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&resource.resource_id)
        .bind(resource.resource_type.as_str())
        .bind(&resource.description)
        .bind(&resource.when_to_use)
        .bind(object_to_text(&resource.metadata))
        .bind(object_to_text(&resource.content))
        .bind(serialize_tags(&resource.tags))
        .bind(&resource.domain)
        .bind(resource.status.as_str())
        .bind(&resource.version)
        .bind(now.timestamp_millis())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM resources WHERE resource_id = ?",
            RESOURCE_COLUMNS
        ))
        .bind(&resource.resource_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        tx.commit().await.map_err(StoreError::backend)?;

        row_to_resource(&row)
    }

    async fn find_by_resource_id(
        &self,
        resource_id: &str,
    ) -> Result<Option<Resource>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM resources WHERE resource_id = ?",
            RESOURCE_COLUMNS
        ))
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.as_ref().map(row_to_resource).transpose()
    }

    async fn list_resources(&self, query: &ListQuery) -> Result<ResourcePage, StoreError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if let Some(resource_type) = query.resource_type.as_deref() {
            clauses.push("resource_type = ?");
            binds.push(resource_type.to_string());
        }
        if let Some(text) = query.text() {
            clauses.push(
                "(description LIKE ? ESCAPE '\\' \
                 OR IFNULL(when_to_use, '') LIKE ? ESCAPE '\\' \
                 OR tags_json LIKE ? ESCAPE '\\')",
            );
            let pattern = format!("%{}%", escape_like(text));
            binds.extend(std::iter::repeat(pattern).take(3));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM resources {}", where_sql);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for value in &binds {
            count_query = count_query.bind(value);
        }
        let total = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        let page_sql = format!(
            "SELECT {} FROM resources {} ORDER BY updated_at DESC, resource_id ASC LIMIT ?",
            RESOURCE_COLUMNS, where_sql
        );
        let mut page_query = sqlx::query(&page_sql);
        for value in &binds {
            page_query = page_query.bind(value);
        }
        let rows = page_query
            .bind(query.effective_limit() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        let resources = rows
            .iter()
            .map(row_to_resource)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResourcePage {
            resources,
            total: total.max(0) as usize,
        })
    }

    async fn record_source_sync(
        &self,
        source_id: &str,
        base_url: &str,
        label: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sources (id, base_url, label, last_sync_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                base_url = excluded.base_url,
                label = excluded.label,
                last_sync_at = excluded.last_sync_at
            "#,
        )
        .bind(source_id)
        .bind(base_url)
        .bind(label.unwrap_or(base_url))
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(())
    }

    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, base_url, label, last_sync_at FROM sources ORDER BY label ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.iter()
            .map(|row| -> Result<Source, StoreError> {
                let last_sync_at: Option<i64> =
                    row.try_get("last_sync_at").map_err(StoreError::backend)?;
                Ok(Source {
                    id: row.try_get("id").map_err(StoreError::backend)?,
                    base_url: row.try_get("base_url").map_err(StoreError::backend)?,
                    label: row.try_get("label").map_err(StoreError::backend)?,
                    last_sync_at: last_sync_at.and_then(DateTime::from_timestamp_millis),
                })
            })
            .collect()
    }
}

fn object_to_text(value: &Option<Map<String, Value>>) -> Option<String> {
    value
        .as_ref()
        .map(|m| Value::Object(m.clone()).to_string())
}

fn text_to_object(text: Option<String>) -> Result<Option<Map<String, Value>>, StoreError> {
    match text {
        None => Ok(None),
        Some(t) => match serde_json::from_str::<Value>(&t).map_err(StoreError::backend)? {
            Value::Object(m) if !m.is_empty() => Ok(Some(m)),
            _ => Ok(None),
        },
    }
}

fn millis(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, StoreError> {
    let ms: i64 = row.try_get(column).map_err(StoreError::backend)?;
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::backend(format!("{} out of range: {}", column, ms)))
}

fn row_to_resource(row: &SqliteRow) -> Result<Resource, StoreError> {
    let get = |column: &str| -> Result<Option<String>, StoreError> {
        row.try_get(column).map_err(StoreError::backend)
    };

    let tags_json: String = row.try_get("tags_json").map_err(StoreError::backend)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(StoreError::backend)?;
    let resource_type: String = row.try_get("resource_type").map_err(StoreError::backend)?;
    let status: String = row.try_get("status").map_err(StoreError::backend)?;

    Ok(Resource {
        resource_id: row.try_get("resource_id").map_err(StoreError::backend)?,
        resource_type: resource_type.into(),
        description: row.try_get("description").map_err(StoreError::backend)?,
        when_to_use: get("when_to_use")?,
        metadata: text_to_object(get("metadata_json")?)?,
        content: text_to_object(get("content_json")?)?,
        tags,
        domain: get("domain")?,
        status: status.into(),
        version: row.try_get("version").map_err(StoreError::backend)?,
        created_at: millis(row, "created_at")?,
        updated_at: millis(row, "updated_at")?,
    })
}

/// Escape `%`, `_` and the escape character itself for a `LIKE .. ESCAPE '\'` pattern.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ardf_core::{ResourceStatus, ResourceType};
    use serde_json::json;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, SqliteStore) {
        let tmp = TempDir::new().unwrap();
        let pool = db::connect_path(&tmp.path().join("data").join("ardf.sqlite"))
            .await
            .unwrap();
        migrate::apply_schema(&pool).await.unwrap();
        (tmp, SqliteStore::new(pool))
    }

    fn flight_tool() -> ResourceInput {
        let mut input = ResourceInput::new(
            "tool_reserve_flight",
            "tool",
            "Book a flight with fare validation",
        );
        input.when_to_use = Some("Use for airline reservations".to_string());
        input.metadata = json!({"version": "1.2.3", "domain": "travel"})
            .as_object()
            .cloned();
        input.content = json!({"endpoint": "/reserve"}).as_object().cloned();
        input.tags = vec!["travel".to_string(), " booking".to_string(), "travel".to_string()];
        input.domain = Some("travel".to_string());
        input.status = Some(ResourceStatus::Published);
        input.version = Some("1.2.3".to_string());
        input
    }

    #[tokio::test]
    async fn test_upsert_roundtrips_all_fields() {
        let (_tmp, store) = open_store().await;
        let stored = store.upsert_resource(flight_tool()).await.unwrap();

        assert_eq!(stored.resource_type, ResourceType::Tool);
        assert_eq!(stored.tags, vec!["travel", "booking"]);
        assert_eq!(stored.metadata.as_ref().unwrap()["domain"], "travel");
        assert_eq!(stored.content.as_ref().unwrap()["endpoint"], "/reserve");
        assert_eq!(stored.status, ResourceStatus::Published);
        assert_eq!(stored.version, "1.2.3");
        assert_eq!(stored.created_at, stored.updated_at);

        let found = store
            .find_by_resource_id("tool_reserve_flight")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, stored);
        assert!(store.find_by_resource_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_upsert_keeps_one_row_and_advances_updated_at() {
        let (_tmp, store) = open_store().await;
        let first = store.upsert_resource(flight_tool()).await.unwrap();
        let second = store.upsert_resource(flight_tool()).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);

        let page = store.list_resources(&ListQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_all_succeed() {
        let (_tmp, store) = open_store().await;

        let mut handles = Vec::new();
        for task in 0..4 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut failures = Vec::new();
                for i in 0..50 {
                    let input = ResourceInput::new(
                        format!("tool_{}", i % 10),
                        "tool",
                        format!("Writer {} pass {}", task, i),
                    );
                    if let Err(e) = store.upsert_resource(input).await {
                        failures.push(e.to_string());
                    }
                }
                failures
            }));
        }

        let mut failures = Vec::new();
        for handle in handles {
            failures.extend(handle.await.unwrap());
        }
        assert!(failures.is_empty(), "upserts failed: {:?}", failures);

        let page = store
            .list_resources(&ListQuery {
                limit: Some(100),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 10);

        let mut stamps: Vec<_> = page.resources.iter().map(|r| r.updated_at).collect();
        stamps.dedup();
        assert_eq!(stamps.len(), 10, "updated_at values must be distinct");
    }

    #[tokio::test]
    async fn test_upsert_replaces_wholesale() {
        let (_tmp, store) = open_store().await;
        store.upsert_resource(flight_tool()).await.unwrap();
        let stored = store
            .upsert_resource(ResourceInput::new("tool_reserve_flight", "tool", "Rebook"))
            .await
            .unwrap();

        assert_eq!(stored.description, "Rebook");
        assert!(stored.when_to_use.is_none());
        assert!(stored.metadata.is_none());
        assert!(stored.content.is_none());
        assert!(stored.tags.is_empty());
        assert!(stored.domain.is_none());
        assert_eq!(stored.status, ResourceStatus::Draft);
        assert_eq!(stored.version, "1.0.0");
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_input() {
        let (_tmp, store) = open_store().await;
        let err = store
            .upsert_resource(ResourceInput::new("", "tool", "desc"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_list_filters_and_counts() {
        let (_tmp, store) = open_store().await;
        store.upsert_resource(flight_tool()).await.unwrap();
        store
            .upsert_resource(ResourceInput::new("doc_policy", "document", "Travel policy handbook"))
            .await
            .unwrap();
        store
            .upsert_resource(ResourceInput::new("prompt_pizza", "prompt", "Order 100% pizza"))
            .await
            .unwrap();

        let tools = store
            .list_resources(&ListQuery {
                resource_type: Some("tool".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tools.total, 1);

        let travel = store
            .list_resources(&ListQuery {
                query: Some("TRAVEL".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(travel.total, 2);

        let airline = store
            .list_resources(&ListQuery {
                query: Some("airline".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(airline.total, 1);

        let booking_tag = store
            .list_resources(&ListQuery {
                resource_type: Some("tool".to_string()),
                query: Some("booking".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(booking_tag.total, 1);

        let percent = store
            .list_resources(&ListQuery {
                query: Some("100%".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(percent.total, 1);
        assert_eq!(percent.resources[0].resource_id, "prompt_pizza");

        let underscore = store
            .list_resources(&ListQuery {
                query: Some("_".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(underscore.total, 0);
    }

    #[tokio::test]
    async fn test_list_orders_by_recency_and_clamps_limit() {
        let (_tmp, store) = open_store().await;
        for i in 0..120 {
            store
                .upsert_resource(ResourceInput::new(format!("tool_{i:03}"), "tool", "A tool"))
                .await
                .unwrap();
        }

        let page = store
            .list_resources(&ListQuery {
                resource_type: Some("tool".to_string()),
                limit: Some(25),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.resources.len(), 25);
        assert_eq!(page.total, 120);
        assert_eq!(page.resources[0].resource_id, "tool_119");
        for pair in page.resources.windows(2) {
            assert!(pair[0].updated_at > pair[1].updated_at);
        }

        let page = store
            .list_resources(&ListQuery {
                limit: Some(500),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.resources.len(), 100);
        assert_eq!(page.total, 120);
    }

    #[tokio::test]
    async fn test_sources_upsert_and_order() {
        let (_tmp, store) = open_store().await;
        store
            .record_source_sync("https://b.example", "https://b.example", None)
            .await
            .unwrap();
        store
            .record_source_sync("primary", "https://a.example", Some("Alpha"))
            .await
            .unwrap();
        store
            .record_source_sync("primary", "https://a2.example", Some("Alpha"))
            .await
            .unwrap();

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].label, "Alpha");
        assert_eq!(sources[0].base_url, "https://a2.example");
        assert_eq!(sources[1].label, "https://b.example");
        assert!(sources.iter().all(|s| s.last_sync_at.is_some()));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
