use chrono::{DateTime, Utc};
use serde::Serialize;

/// Observable state of the sync coordinator.
///
/// Process-wide and transient: it is not persisted, so a restart begins with
/// no errors and no last sync time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Replay failures in the order they happened, until cleared.
    pub errors: Vec<String>,
}

/// Guard state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Syncing,
}
