//! # Offline Sync
//!
//! Replays work captured while offline once connectivity returns.
//!
//! ## Components
//!
//! - **Sync Coordinator** (`coordinator`): guarded drain cycles over the offline queue
//! - **Sync Status** (`status`): observable `is_syncing` / `last_sync_time` / `errors`
//! - **Replay Registry** (`replay`): handler lookup for queued application actions
//! - **Action Gate** (`actions`): captures queueable actions submitted while offline

pub mod actions;
pub mod coordinator;
pub mod error;
pub mod replay;
pub mod status;

pub use actions::{ActionGate, SubmitOutcome};
pub use coordinator::{DrainOutcome, DrainReport, ItemFailure, SyncCoordinator, SyncListener};
pub use error::{Result, SyncError};
pub use replay::{ReplayHandler, ReplayRegistry};
pub use status::{SyncPhase, SyncStatus};
