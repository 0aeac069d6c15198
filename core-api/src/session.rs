//! Persisted session: bearer token plus the signed-in user's profile.

use std::sync::Arc;

use bridge_traits::KeyValueStore;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::error::Result;

pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    token_key: String,
    profile_key: String,
}

impl SessionStore {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        token_key: impl Into<String>,
        profile_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            token_key: token_key.into(),
            profile_key: profile_key.into(),
        }
    }

    /// Persist a fresh login.
    pub async fn save<P: Serialize>(&self, token: &str, profile: &P) -> Result<()> {
        let profile = serde_json::to_string(profile)?;
        self.store.set(&self.token_key, token).await?;
        self.store.set(&self.profile_key, &profile).await?;
        Ok(())
    }

    /// Replace the token, e.g. after a refresh.
    pub async fn set_token(&self, token: &str) -> Result<()> {
        self.store.set(&self.token_key, token).await?;
        Ok(())
    }

    /// Current bearer token. Read failures and empty values count as absent.
    pub async fn token(&self) -> Option<String> {
        match self.store.get(&self.token_key).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(err) => {
                warn!(error = %err, "Failed to read auth token");
                None
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token().await.is_some()
    }

    /// Stored profile; a corrupt record is logged and treated as absent.
    pub async fn profile<P: DeserializeOwned>(&self) -> Result<Option<P>> {
        let Some(raw) = self.store.get(&self.profile_key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(err) => {
                warn!(key = %self.profile_key, error = %err, "Ignoring corrupt user profile");
                Ok(None)
            }
        }
    }

    /// Remove token and profile (logout).
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(&self.token_key).await?;
        self.store.remove(&self.profile_key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::MemoryKeyValueStore;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        id: u64,
        username: String,
    }

    fn session() -> (Arc<MemoryKeyValueStore>, SessionStore) {
        let store = Arc::new(MemoryKeyValueStore::new());
        let session = SessionStore::new(store.clone(), "@auth_token", "@user_data");
        (store, session)
    }

    #[tokio::test]
    async fn test_save_and_read_back() {
        let (_, session) = session();
        let profile = Profile {
            id: 1,
            username: "emilys".into(),
        };
        session.save("tok-1", &profile).await.unwrap();

        assert_eq!(session.token().await.as_deref(), Some("tok-1"));
        assert!(session.is_authenticated().await);
        assert_eq!(session.profile::<Profile>().await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_empty_token_is_absent() {
        let (store, session) = session();
        store.set("@auth_token", "").await.unwrap();
        assert!(session.token().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_profile_is_absent() {
        let (store, session) = session();
        store.set("@user_data", "{oops").await.unwrap();
        assert_eq!(session.profile::<Profile>().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_removes_session_only() {
        let (store, session) = session();
        store.set("@offline_queue", "[]").await.unwrap();
        session
            .save(
                "tok",
                &Profile {
                    id: 2,
                    username: "x".into(),
                },
            )
            .await
            .unwrap();

        session.clear().await.unwrap();
        assert!(!session.is_authenticated().await);
        assert_eq!(session.profile::<Profile>().await.unwrap(), None);
        assert!(store.get("@offline_queue").await.unwrap().is_some());
    }
}
