//! Durable FIFO of work captured while offline.
//!
//! Every mutation of the queue writes the full snapshot to the key-value
//! store before returning, so a crash never loses an acknowledged item.
//! Items are not deduplicated: two identical offline requests are replayed
//! twice.

use std::fmt;
use std::sync::Arc;

use bridge_traits::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::operation::ReplayableOperation;
use crate::request::RequestDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueItemId(Uuid);

impl QueueItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for QueueItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a queue item replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum QueuedOperation {
    /// A raw HTTP call, re-sent through the gateway.
    Request(RequestDescriptor),
    /// An application action, re-dispatched through its registered handler.
    Action(ReplayableOperation),
}

impl QueuedOperation {
    /// Short human-readable label for logs and events.
    pub fn label(&self) -> String {
        match self {
            QueuedOperation::Request(request) => format!("{} {}", request.method, request.path),
            QueuedOperation::Action(action) => action.kind().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub operation: QueuedOperation,
    pub enqueued_at: DateTime<Utc>,
    /// Failed replay attempts so far.
    #[serde(default)]
    pub retry_count: u32,
}

pub struct OfflineQueue {
    items: Mutex<Vec<QueueItem>>,
    store: Arc<dyn KeyValueStore>,
    storage_key: String,
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, storage_key: impl Into<String>) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            store,
            storage_key: storage_key.into(),
        }
    }

    /// Restore the persisted snapshot.
    ///
    /// A missing or corrupt snapshot yields an empty queue. Items enqueued on
    /// this instance before `load` stay behind the restored ones.
    pub async fn load(&self) -> usize {
        let restored = match self.store.get(&self.storage_key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<QueueItem>>(&raw) {
                Ok(items) => items,
                Err(err) => {
                    warn!(key = %self.storage_key, error = %err, "Discarding corrupt offline queue");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(key = %self.storage_key, error = %err, "Failed to read offline queue");
                Vec::new()
            }
        };

        let count = restored.len();
        let mut items = self.items.lock().await;
        if !items.is_empty() {
            let pending = std::mem::take(&mut *items);
            *items = restored;
            items.extend(pending);
            self.persist(&items).await;
        } else {
            *items = restored;
        }

        if count > 0 {
            info!(count, "Restored offline queue");
        }
        count
    }

    /// Append an operation and persist. Returns the stored item.
    pub async fn enqueue(&self, operation: QueuedOperation, enqueued_at: DateTime<Utc>) -> QueueItem {
        let item = QueueItem {
            id: QueueItemId::new(),
            operation,
            enqueued_at,
            retry_count: 0,
        };

        let mut items = self.items.lock().await;
        items.push(item.clone());
        self.persist(&items).await;
        debug!(item_id = %item.id, label = %item.operation.label(), queue_len = items.len(), "Enqueued offline item");
        item
    }

    /// Put a failed item back at the end with its retry count bumped.
    pub async fn requeue(&self, mut item: QueueItem) -> QueueItem {
        item.retry_count += 1;
        let mut items = self.items.lock().await;
        items.push(item.clone());
        self.persist(&items).await;
        item
    }

    /// Take the whole queue in FIFO order, leaving it empty.
    pub async fn drain(&self) -> Vec<QueueItem> {
        let mut items = self.items.lock().await;
        let taken = std::mem::take(&mut *items);
        if !taken.is_empty() {
            self.persist(&items).await;
        }
        taken
    }

    pub async fn remove(&self, id: QueueItemId) -> Option<QueueItem> {
        let mut items = self.items.lock().await;
        let index = items.iter().position(|item| item.id == id)?;
        let removed = items.remove(index);
        self.persist(&items).await;
        Some(removed)
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Snapshot of the current items.
    pub async fn items(&self) -> Vec<QueueItem> {
        self.items.lock().await.clone()
    }

    async fn persist(&self, items: &[QueueItem]) {
        let result = match serde_json::to_string(items) {
            Ok(json) => self.store.set(&self.storage_key, &json).await,
            Err(err) => {
                warn!(error = %err, "Failed to serialize offline queue");
                return;
            }
        };
        if let Err(err) = result {
            warn!(key = %self.storage_key, error = %err, "Failed to persist offline queue");
        }
    }
}
