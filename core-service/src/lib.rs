//! Core service façade and bootstrap helpers.
//!
//! [`StorefrontCore`] wires the configured bridges into the API gateway, the
//! offline queue and the sync coordinator, and is the one handle a host
//! application keeps around. Desktop hosts enable the `desktop-shims` feature
//! so missing bridges fall back to reqwest, SQLite and a TCP reachability
//! probe.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_api::{ApiGateway, ApiResponse, OperationKind, ReplayableOperation, RequestDescriptor, SessionStore};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus};
use core_sync::{
    ActionGate, DrainOutcome, ReplayHandler, ReplayRegistry, SubmitOutcome, SyncCoordinator,
    SyncListener, SyncStatus,
};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info};

/// Primary façade exposed to host applications.
pub struct StorefrontCore {
    event_bus: EventBus,
    gateway: Arc<ApiGateway>,
    registry: Arc<ReplayRegistry>,
    coordinator: Arc<SyncCoordinator>,
    action_gate: ActionGate,
    listener: Mutex<Option<SyncListener>>,
}

impl StorefrontCore {
    /// Build every component from a validated configuration.
    ///
    /// Restores the persisted offline queue but does not subscribe to
    /// connectivity changes; call [`StorefrontCore::start_sync`] for that.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let gateway = Arc::new(ApiGateway::new(&config, event_bus.clone()).await);
        let registry = Arc::new(ReplayRegistry::new());
        let coordinator = Arc::new(SyncCoordinator::new(
            gateway.clone(),
            registry.clone(),
            config.network_monitor.clone(),
            config.clock.clone(),
            event_bus.clone(),
        ));
        let action_gate = ActionGate::new(gateway.clone());

        info!(
            base_url = %config.base_url,
            pending = gateway.queue().len().await,
            "Storefront core ready"
        );

        Ok(Self {
            event_bus,
            gateway,
            registry,
            coordinator,
            action_gate,
            listener: Mutex::new(None),
        })
    }

    pub fn gateway(&self) -> &Arc<ApiGateway> {
        &self.gateway
    }

    pub fn session(&self) -> &SessionStore {
        self.gateway.session()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Shorthand for `gateway().execute(..)`.
    pub async fn execute(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn register_handler(&self, kind: OperationKind, handler: Arc<dyn ReplayHandler>) {
        self.registry.register(kind, handler).await;
    }

    /// Offer an action to the offline gate. The host applies it locally either way.
    pub async fn submit_action(&self, action: ReplayableOperation) -> SubmitOutcome {
        self.action_gate.submit(action).await
    }

    pub async fn sync_now(&self) -> DrainOutcome {
        self.coordinator.drain().await
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.coordinator.status()
    }

    pub fn subscribe_sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.coordinator.subscribe_status()
    }

    pub fn clear_sync_errors(&self) {
        self.coordinator.clear_errors();
    }

    /// Start draining on connectivity changes. Calling it again is a no-op.
    pub async fn start_sync(&self) -> Result<()> {
        let mut listener = self.listener.lock().await;
        if listener.as_ref().is_some_and(SyncListener::is_running) {
            debug!("Sync listener already running");
            return Ok(());
        }
        *listener = Some(self.coordinator.start().await?);
        Ok(())
    }

    /// Stop the connectivity listener. Queued items stay persisted.
    pub async fn shutdown(&self) {
        if let Some(listener) = self.listener.lock().await.take() {
            listener.stop().await;
            info!("Sync listener stopped");
        }
    }
}

/// Bootstrap with desktop defaults for every bridge.
///
/// ```ignore
/// let core = core_service::bootstrap_desktop("https://dummyjson.com").await?;
/// core.start_sync().await?;
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(base_url: impl Into<String>) -> Result<StorefrontCore> {
    let config = CoreConfig::builder().base_url(base_url).build().await?;
    StorefrontCore::bootstrap(config).await
}
