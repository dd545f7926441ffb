//! Idempotent schema migrations for the catalog database.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Millisecond Unix time, as an SQLite expression.
const NOW_MS: &str = "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)";

/// `ardf init`: create the database file and apply the schema.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create tables, indexes and triggers if they do not exist yet.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resources (
            resource_id TEXT PRIMARY KEY,
            resource_type TEXT NOT NULL,
            description TEXT NOT NULL,
            when_to_use TEXT,
            metadata_json TEXT,
            content_json TEXT,
            tags_json TEXT NOT NULL DEFAULT '[]',
            domain TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            version TEXT NOT NULL DEFAULT '1.0.0',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id TEXT PRIMARY KEY,
            base_url TEXT NOT NULL,
            label TEXT NOT NULL,
            last_sync_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_resources_updated_at ON resources(updated_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_resources_type ON resources(resource_type)")
        .execute(pool)
        .await?;

    // Any update that does not advance updated_at gets it advanced here,
    // including writes made outside the store.
    sqlx::query(&format!(
        r#"
        CREATE TRIGGER IF NOT EXISTS trg_resources_updated_at
        AFTER UPDATE ON resources
        FOR EACH ROW
        WHEN NEW.updated_at <= OLD.updated_at
        BEGIN
            UPDATE resources
            SET updated_at = MAX({now}, OLD.updated_at + 1)
            WHERE resource_id = NEW.resource_id;
        END
        "#,
        now = NOW_MS
    ))
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_path;
    use sqlx::Row;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let pool = connect_path(&tmp.path().join("ardf.sqlite")).await.unwrap();
        apply_schema(&pool).await.unwrap();
        apply_schema(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap()
        .iter()
        .map(|r| r.get("name"))
        .collect();
        assert!(tables.contains(&"resources".to_string()));
        assert!(tables.contains(&"sources".to_string()));
    }

    #[tokio::test]
    async fn test_trigger_bumps_updated_at_on_raw_update() {
        let tmp = TempDir::new().unwrap();
        let pool = connect_path(&tmp.path().join("ardf.sqlite")).await.unwrap();
        apply_schema(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO resources (resource_id, resource_type, description, created_at, updated_at)
             VALUES ('a', 'tool', 'Alpha', 1000, 1000)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("UPDATE resources SET description = 'Alpha v2' WHERE resource_id = 'a'")
            .execute(&pool)
            .await
            .unwrap();

        let updated_at: i64 = sqlx::query_scalar("SELECT updated_at FROM resources WHERE resource_id = 'a'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(updated_at > 1000);
    }
}
