//! # Sync Coordinator
//!
//! Drains the offline queue when connectivity returns.
//!
//! ## Workflow
//!
//! 1. Acquire the instance guard; a trigger that finds a drain in flight is dropped
//! 2. Snapshot and clear the offline queue
//! 3. Mark `is_syncing`
//! 4. Replay each item in enqueue order: requests through
//!    [`ApiGateway::dispatch`], actions through their [`ReplayHandler`]
//! 5. Discard successes; append failures to the back of the queue and record
//!    their message in [`SyncStatus::errors`]
//! 6. Clear `is_syncing` and stamp `last_sync_time`, whatever happened above
//!
//! Failed items are retried on the next trigger, never within the same cycle.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let coordinator = Arc::new(SyncCoordinator::new(
//!     gateway,
//!     registry,
//!     config.network_monitor.clone(),
//!     config.clock.clone(),
//!     event_bus,
//! ));
//!
//! // Drain on every connectivity-restored event until the listener is dropped.
//! let listener = coordinator.start().await?;
//!
//! // Or drain explicitly.
//! match coordinator.drain().await {
//!     DrainOutcome::Completed(report) => println!("{} replayed", report.replayed),
//!     DrainOutcome::Empty | DrainOutcome::Skipped => {}
//! }
//! ```
//!
//! [`ReplayHandler`]: crate::replay::ReplayHandler

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bridge_traits::{Clock, NetworkMonitor};
use core_api::{ApiGateway, QueueItem, QueueItemId, QueuedOperation};
use core_runtime::events::{CoreEvent, EventBus, NetworkEvent, SyncEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::replay::ReplayRegistry;
use crate::status::{SyncPhase, SyncStatus};

/// Result of one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// A cycle ran over a non-empty snapshot.
    Completed(DrainReport),
    /// Nothing was queued; status untouched.
    Empty,
    /// Another cycle was already running.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub cycle_id: String,
    pub replayed: usize,
    pub failures: Vec<ItemFailure>,
    pub duration: Duration,
}

impl DrainReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub item_id: QueueItemId,
    pub message: String,
    /// False when the item was dropped because it can never replay.
    pub requeued: bool,
}

pub struct SyncCoordinator {
    gateway: Arc<ApiGateway>,
    registry: Arc<ReplayRegistry>,
    network_monitor: Arc<dyn NetworkMonitor>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    phase: Mutex<SyncPhase>,
    status: watch::Sender<SyncStatus>,
}

impl SyncCoordinator {
    pub fn new(
        gateway: Arc<ApiGateway>,
        registry: Arc<ReplayRegistry>,
        network_monitor: Arc<dyn NetworkMonitor>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            gateway,
            registry,
            network_monitor,
            clock,
            event_bus,
            phase: Mutex::new(SyncPhase::Idle),
            status,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn is_syncing(&self) -> bool {
        self.phase() == SyncPhase::Syncing
    }

    pub fn clear_errors(&self) {
        self.status.send_if_modified(|status| {
            let had_errors = !status.errors.is_empty();
            status.errors.clear();
            had_errors
        });
    }

    /// Items waiting for the next cycle.
    pub async fn pending(&self) -> usize {
        self.gateway.queue().len().await
    }

    fn phase(&self) -> SyncPhase {
        *self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_begin(&self) -> Option<CycleGuard<'_>> {
        let mut phase = self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *phase == SyncPhase::Syncing {
            return None;
        }
        *phase = SyncPhase::Syncing;
        Some(CycleGuard {
            coordinator: self,
            started: false,
        })
    }

    /// Run one drain cycle.
    #[instrument(skip(self))]
    pub async fn drain(&self) -> DrainOutcome {
        let Some(mut guard) = self.try_begin() else {
            debug!("Drain already in flight, dropping trigger");
            let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Skipped));
            return DrainOutcome::Skipped;
        };

        let items = self.gateway.queue().drain().await;
        if items.is_empty() {
            return DrainOutcome::Empty;
        }

        guard.mark_started();
        let cycle_id = Uuid::new_v4().to_string();
        let started = tokio::time::Instant::now();

        info!(cycle_id = %cycle_id, queued_items = items.len(), "Sync started");
        let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Started {
            cycle_id: cycle_id.clone(),
            queued_items: items.len(),
        }));

        let mut replayed = 0;
        let mut failures = Vec::new();

        for item in items {
            let item_id = item.id;
            match self.replay(&item).await {
                Ok(()) => {
                    replayed += 1;
                    debug!(item_id = %item_id, "Replayed queued item");
                    let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::ItemReplayed {
                        cycle_id: cycle_id.clone(),
                        item_id: item_id.to_string(),
                    }));
                }
                Err(err) => {
                    let requeued = !matches!(err, SyncError::HandlerMissing { .. });
                    let message = SyncError::SyncItemFailed {
                        item_id: item_id.to_string(),
                        label: item.operation.label(),
                        reason: err.to_string(),
                    }
                    .to_string();

                    if requeued {
                        self.gateway.queue().requeue(item).await;
                    }
                    warn!(item_id = %item_id, requeued, error = %err, "Queued item failed");

                    self.status
                        .send_modify(|status| status.errors.push(message.clone()));
                    let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::ItemFailed {
                        cycle_id: cycle_id.clone(),
                        item_id: item_id.to_string(),
                        message: message.clone(),
                        requeued,
                    }));
                    failures.push(ItemFailure {
                        item_id,
                        message,
                        requeued,
                    });
                }
            }
        }

        drop(guard);

        let duration = started.elapsed();
        info!(
            cycle_id = %cycle_id,
            replayed,
            failed = failures.len(),
            duration_ms = duration.as_millis() as u64,
            "Sync completed"
        );
        let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Completed {
            cycle_id: cycle_id.clone(),
            replayed,
            failed: failures.len(),
            duration_ms: duration.as_millis() as u64,
        }));

        DrainOutcome::Completed(DrainReport {
            cycle_id,
            replayed,
            failures,
            duration,
        })
    }

    async fn replay(&self, item: &QueueItem) -> Result<()> {
        match &item.operation {
            QueuedOperation::Request(descriptor) => {
                self.gateway.dispatch(descriptor).await?;
                Ok(())
            }
            QueuedOperation::Action(action) => {
                let kind = action.kind();
                let handler = self
                    .registry
                    .get(kind)
                    .await
                    .ok_or(SyncError::HandlerMissing { kind })?;
                handler.replay(action, &self.gateway).await
            }
        }
    }

    /// Drain whenever connectivity is restored.
    ///
    /// Runs one drain immediately when already online, so a queue restored
    /// from a previous session is not left waiting for a network change.
    /// Reports that repeat the current state (such as a monitor echoing it on
    /// subscribe) are ignored.
    /// The subscription lives until the returned listener is stopped or dropped.
    pub async fn start(self: &Arc<Self>) -> Result<SyncListener> {
        let mut changes = self.network_monitor.subscribe_changes().await?;
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let coordinator = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut connected = coordinator.network_monitor.is_connected().await;
            if connected {
                coordinator.spawn_drain();
            }

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    change = changes.next() => {
                        let Some(info) = change else {
                            debug!("Network change stream ended");
                            break;
                        };
                        let was_connected = std::mem::replace(&mut connected, info.is_connected());
                        match (was_connected, connected) {
                            (false, true) => {
                                info!("Connectivity restored");
                                let _ = coordinator.event_bus.emit(CoreEvent::Network(NetworkEvent::Online));
                                coordinator.spawn_drain();
                            }
                            (true, false) => {
                                info!("Connectivity lost");
                                let _ = coordinator.event_bus.emit(CoreEvent::Network(NetworkEvent::Offline));
                            }
                            _ => debug!(connected, "Connectivity unchanged"),
                        }
                    }
                }
            }
        });

        Ok(SyncListener {
            token,
            handle: Some(handle),
        })
    }

    fn spawn_drain(self: &Arc<Self>) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.drain().await;
        });
    }
}

/// Releases the guard on every exit path, including unwinding.
struct CycleGuard<'a> {
    coordinator: &'a SyncCoordinator,
    started: bool,
}

impl CycleGuard<'_> {
    fn mark_started(&mut self) {
        self.started = true;
        self.coordinator
            .status
            .send_modify(|status| status.is_syncing = true);
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if self.started {
            let now = self.coordinator.clock.now();
            self.coordinator.status.send_modify(|status| {
                status.is_syncing = false;
                status.last_sync_time = Some(now);
            });
        }
        *self
            .coordinator
            .phase
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = SyncPhase::Idle;
    }
}

/// Handle to the connectivity subscription started by [`SyncCoordinator::start`].
pub struct SyncListener {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SyncListener {
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Unsubscribe and wait for the listener task to exit.
    ///
    /// A drain already in flight runs to completion.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for SyncListener {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
