//! Offline capture of application actions.
//!
//! The host applies every action locally (optimistic UI). The gate only
//! decides whether the action must also be remembered for the server: when
//! the device is offline and the action kind is queueable, it is appended to
//! the offline queue and replayed by the coordinator later.

use std::collections::HashSet;
use std::sync::Arc;

use core_api::{ApiGateway, OperationKind, QueueItemId, ReplayableOperation};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Captured for replay.
    Queued { item_id: QueueItemId },
    /// Online, or the kind is not queueable; nothing was recorded.
    PassThrough,
}

pub struct ActionGate {
    gateway: Arc<ApiGateway>,
    queueable: HashSet<OperationKind>,
}

impl ActionGate {
    /// Gate with every cart action queueable.
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self::with_queueable(gateway, OperationKind::ALL)
    }

    pub fn with_queueable(
        gateway: Arc<ApiGateway>,
        kinds: impl IntoIterator<Item = OperationKind>,
    ) -> Self {
        Self {
            gateway,
            queueable: kinds.into_iter().collect(),
        }
    }

    pub fn is_queueable(&self, kind: OperationKind) -> bool {
        self.queueable.contains(&kind)
    }

    pub async fn submit(&self, operation: ReplayableOperation) -> SubmitOutcome {
        let kind = operation.kind();
        if !self.is_queueable(kind) || self.gateway.is_online().await {
            return SubmitOutcome::PassThrough;
        }

        let item = self.gateway.enqueue_action(operation).await;
        debug!(item_id = %item.id, kind = %kind, "Captured offline action");
        SubmitOutcome::Queued { item_id: item.id }
    }
}
