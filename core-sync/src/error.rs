use bridge_traits::BridgeError;
use core_api::{ApiError, OperationKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to sync {label} ({item_id}): {reason}")]
    SyncItemFailed {
        item_id: String,
        label: String,
        reason: String,
    },

    #[error("No replay handler registered for {kind}")]
    HandlerMissing { kind: OperationKind },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Platform bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
