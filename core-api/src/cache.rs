//! Response cache with TTL freshness.
//!
//! Successful reads are stored in the key-value store under
//! `<prefix><identity>` as `{"payload": ..., "stored_at": ...}`. Freshness is
//! checked lazily on read; nothing sweeps expired entries. A small LRU tier
//! in memory avoids a store round trip for hot identities.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{Clock, KeyValueStore};
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::request::RequestIdentity;

/// Persisted cache record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Raw response body.
    pub payload: String,
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Age at `now`; entries stamped in the future count as brand new.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }
}

pub struct ResponseCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    prefix: String,
    memory: Option<Mutex<LruCache<String, CachedResponse>>>,
}

impl ResponseCache {
    /// `memory_capacity` of zero disables the in-memory tier.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        prefix: impl Into<String>,
        memory_capacity: usize,
    ) -> Self {
        Self {
            store,
            clock,
            ttl,
            prefix: prefix.into(),
            memory: NonZeroUsize::new(memory_capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key_for(&self, identity: &RequestIdentity) -> String {
        format!("{}{}", self.prefix, identity)
    }

    /// Store a payload stamped with the current time.
    pub async fn put(&self, identity: &RequestIdentity, payload: &str) -> Result<()> {
        let key = self.key_for(identity);
        let entry = CachedResponse {
            payload: payload.to_string(),
            stored_at: self.clock.now(),
        };

        self.store.set(&key, &serde_json::to_string(&entry)?).await?;

        if let Some(memory) = &self.memory {
            memory.lock().await.put(key.clone(), entry);
        }
        debug!(key = %key, "Cached response");
        Ok(())
    }

    /// Fresh entry for `identity`, if any.
    ///
    /// Expired, unreadable and corrupt entries are all misses; corrupt ones are
    /// logged.
    pub async fn get(&self, identity: &RequestIdentity) -> Option<CachedResponse> {
        let key = self.key_for(identity);

        if let Some(memory) = &self.memory {
            if let Some(entry) = memory.lock().await.get(&key) {
                return self.fresh(entry.clone());
            }
        }

        let entry = match self.load(&key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %key, error = %err, "Ignoring unreadable cache entry");
                return None;
            }
        };

        if let Some(memory) = &self.memory {
            memory.lock().await.put(key, entry.clone());
        }
        self.fresh(entry)
    }

    async fn load(&self, key: &str) -> Result<Option<CachedResponse>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| ApiError::CacheCorrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn fresh(&self, entry: CachedResponse) -> Option<CachedResponse> {
        if entry.age(self.clock.now()) < self.ttl {
            Some(entry)
        } else {
            None
        }
    }

    pub async fn invalidate(&self, identity: &RequestIdentity) -> Result<()> {
        let key = self.key_for(identity);
        if let Some(memory) = &self.memory {
            memory.lock().await.pop(&key);
        }
        self.store.remove(&key).await?;
        Ok(())
    }

    /// Drop every cached response. Returns the number of persisted entries removed.
    pub async fn clear(&self) -> Result<usize> {
        if let Some(memory) = &self.memory {
            memory.lock().await.clear();
        }
        Ok(self.store.remove_prefix(&self.prefix).await?)
    }
}
