//! Key-Value Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::KeyValueStore,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::PathBuf;
use tracing::debug;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS kv_entries (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

/// SQLite-backed key-value store implementation
///
/// Provides persistent string storage using SQLite:
/// - Upsert semantics for `set`
/// - Prefix listing for cache maintenance
/// - Async operations
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Create a new store with the given database path
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to connect to DB: {}", e)))?;

        Self::create_table(&pool).await?;
        debug!(path = ?db_path, "Initialized key-value store");

        Ok(Self { pool })
    }

    /// Create an in-memory store (for testing)
    pub async fn in_memory() -> Result<Self> {
        // Every connection to `:memory:` is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to connect to DB: {}", e)))?;

        Self::create_table(&pool).await?;

        Ok(Self { pool })
    }

    async fn create_table(pool: &SqlitePool) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to read key: {}", e)))?;

        Ok(row.map(|row| row.get::<String, _>(0)))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Self::now())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::StorageError(format!("Failed to write key: {}", e)))?;

        debug!(key = key, bytes = value.len(), "Stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to remove key: {}", e)))?;

        debug!(key = key, "Removed value");
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to check key: {}", e)))?;

        Ok(row.is_some())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        // instr() instead of LIKE: cache prefixes contain `_`
        let rows = sqlx::query("SELECT key FROM kv_entries WHERE instr(key, ?) = 1 ORDER BY key")
            .bind(prefix)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to list keys: {}", e)))?;

        Ok(rows.iter().map(|row| row.get::<String, _>(0)).collect())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE instr(key, ?) = 1")
            .bind(prefix)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to remove keys: {}", e)))?;

        debug!(prefix = prefix, removed = result.rows_affected(), "Removed values by prefix");
        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_creation() {
        let store = SqliteKeyValueStore::in_memory().await;
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn test_set_get_overwrite_remove() {
        let store = SqliteKeyValueStore::in_memory().await.unwrap();

        assert_eq!(store.get("@auth_token").await.unwrap(), None);

        store.set("@auth_token", "first").await.unwrap();
        store.set("@auth_token", "second").await.unwrap();
        assert_eq!(
            store.get("@auth_token").await.unwrap().as_deref(),
            Some("second")
        );
        assert!(store.has_key("@auth_token").await.unwrap());

        store.remove("@auth_token").await.unwrap();
        assert!(!store.has_key("@auth_token").await.unwrap());
    }

    #[tokio::test]
    async fn test_prefix_does_not_treat_underscore_as_wildcard() {
        let store = SqliteKeyValueStore::in_memory().await.unwrap();
        store.set("@api_cache_(GET) /a", "1").await.unwrap();
        store.set("@api_cache_(GET) /b", "2").await.unwrap();
        store.set("@apiXcacheX", "3").await.unwrap();
        store.set("@offline_queue", "[]").await.unwrap();

        let keys = store.list_keys("@api_cache_").await.unwrap();
        assert_eq!(keys, vec!["@api_cache_(GET) /a", "@api_cache_(GET) /b"]);

        assert_eq!(store.remove_prefix("@api_cache_").await.unwrap(), 2);
        assert!(store.has_key("@apiXcacheX").await.unwrap());
        assert!(store.has_key("@offline_queue").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_store_persists_between_instances() {
        let dir = std::env::temp_dir().join(format!("storefront-kv-{}", std::process::id()));
        let path = dir.join("store.db");

        {
            let store = SqliteKeyValueStore::new(path.clone()).await.unwrap();
            store.set("@offline_queue", "[1]").await.unwrap();
        }

        let reopened = SqliteKeyValueStore::new(path).await.unwrap();
        assert_eq!(
            reopened.get("@offline_queue").await.unwrap().as_deref(),
            Some("[1]")
        );

        let _ = std::fs::remove_dir_all(dir);
    }
}
