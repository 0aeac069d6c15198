use bridge_traits::BridgeError;
use thiserror::Error;

use crate::queue::QueueItemId;

/// Failures surfaced by the API layer.
///
/// `QueuedForSync` is not a hard failure: the mutation was accepted into the
/// offline queue and will be replayed once connectivity returns. Callers should
/// show "will sync" messaging for it rather than an error state.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No connectivity and no cached data for {identity}")]
    NoConnectivity { identity: String },

    #[error("Upstream request failed for {identity}: {message}")]
    UpstreamFailure {
        identity: String,
        status: Option<u16>,
        message: String,
        /// Retries spent before giving up.
        retries: u32,
    },

    #[error("Offline: request queued for sync as item {item_id}")]
    QueuedForSync { item_id: QueueItemId },

    #[error("Corrupt cache entry {key}: {reason}")]
    CacheCorrupt { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] BridgeError),
}

impl ApiError {
    /// True when the call was accepted for deferred sync.
    pub fn is_queued(&self) -> bool {
        matches!(self, ApiError::QueuedForSync { .. })
    }

    /// HTTP status of the final upstream response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::UpstreamFailure { status, .. } => *status,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
