//! Key-Value Storage Abstraction
//!
//! Durable string storage used for the response cache, the persisted offline
//! queue, the auth token and the signed-in user profile.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::error::Result;

/// Key-value storage trait
///
/// Abstracts platform-specific persistent storage:
/// - iOS: UserDefaults / files in the app container
/// - Android: SharedPreferences / DataStore
/// - Desktop: SQLite (`bridge-desktop`)
///
/// Values are opaque strings; callers own the encoding (JSON in practice).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember_token(store: &dyn KeyValueStore, token: &str) -> Result<()> {
///     store.set("@auth_token", token).await
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value, `Ok(None)` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// List all keys starting with `prefix`
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove every key starting with `prefix`
    async fn remove_prefix(&self, prefix: &str) -> Result<usize> {
        let keys = self.list_keys(prefix).await?;
        for key in &keys {
            self.remove(key).await?;
        }
        Ok(keys.len())
    }
}

/// In-memory store.
///
/// Not durable; used by tests and by hosts that persist state themselves.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);

        store.set("@auth_token", "abc").await.unwrap();
        assert_eq!(store.get("@auth_token").await.unwrap().as_deref(), Some("abc"));
        assert!(store.has_key("@auth_token").await.unwrap());

        store.set("@auth_token", "def").await.unwrap();
        assert_eq!(store.get("@auth_token").await.unwrap().as_deref(), Some("def"));

        store.remove("@auth_token").await.unwrap();
        assert!(!store.has_key("@auth_token").await.unwrap());
        store.remove("@auth_token").await.unwrap();
    }

    #[tokio::test]
    async fn test_prefix_operations() {
        let store = MemoryKeyValueStore::new();
        store.set("@api_cache_a", "1").await.unwrap();
        store.set("@api_cache_b", "2").await.unwrap();
        store.set("@offline_queue", "[]").await.unwrap();

        let mut keys = store.list_keys("@api_cache_").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["@api_cache_a", "@api_cache_b"]);

        assert_eq!(store.remove_prefix("@api_cache_").await.unwrap(), 2);
        assert_eq!(store.len().await, 1);
    }
}
