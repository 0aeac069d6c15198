//! Handler lookup for queued application actions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use core_api::{ApiGateway, OperationKind, ReplayableOperation};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

/// Re-dispatches one kind of [`ReplayableOperation`] during sync.
///
/// Handlers should send through [`ApiGateway::dispatch`] so a failure comes
/// back as an error instead of being queued again.
#[async_trait]
pub trait ReplayHandler: Send + Sync {
    async fn replay(&self, operation: &ReplayableOperation, gateway: &ApiGateway) -> Result<()>;
}

#[derive(Default)]
pub struct ReplayRegistry {
    handlers: RwLock<HashMap<OperationKind, Arc<dyn ReplayHandler>>>,
}

impl ReplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub async fn register(&self, kind: OperationKind, handler: Arc<dyn ReplayHandler>) {
        debug!(kind = %kind, "Registered replay handler");
        self.handlers.write().await.insert(kind, handler);
    }

    pub async fn unregister(&self, kind: OperationKind) -> bool {
        self.handlers.write().await.remove(&kind).is_some()
    }

    pub async fn get(&self, kind: OperationKind) -> Option<Arc<dyn ReplayHandler>> {
        self.handlers.read().await.get(&kind).cloned()
    }

    pub async fn kinds(&self) -> Vec<OperationKind> {
        let mut kinds: Vec<_> = self.handlers.read().await.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl ReplayHandler for Noop {
        async fn replay(&self, _: &ReplayableOperation, _: &ApiGateway) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = ReplayRegistry::new();
        assert!(registry.get(OperationKind::AddToCart).await.is_none());

        registry
            .register(OperationKind::AddToCart, Arc::new(Noop))
            .await;
        registry
            .register(OperationKind::RemoveFromCart, Arc::new(Noop))
            .await;

        assert!(registry.get(OperationKind::AddToCart).await.is_some());
        assert!(registry.get(OperationKind::UpdateQuantity).await.is_none());
        assert_eq!(
            registry.kinds().await,
            vec![OperationKind::AddToCart, OperationKind::RemoveFromCart]
        );

        assert!(registry.unregister(OperationKind::AddToCart).await);
        assert!(!registry.unregister(OperationKind::AddToCart).await);
    }
}
