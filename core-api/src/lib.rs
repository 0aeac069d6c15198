//! # Core API
//!
//! Offline-aware access to the upstream REST service.
//!
//! - [`ApiGateway`] - entry point; token attachment, connectivity checks, retries
//! - [`ResponseCache`] - TTL cache of successful reads, persisted in the KV store
//! - [`OfflineQueue`] - durable FIFO of mutations captured while offline
//! - [`RetryPolicy`] - linear backoff decisions
//! - [`SessionStore`] - bearer token and user profile
//!
//! ## Usage
//!
//! ```ignore
//! use core_api::{ApiError, ApiGateway, RequestDescriptor};
//!
//! let gateway = ApiGateway::new(&config, event_bus).await;
//!
//! let products = gateway
//!     .execute(RequestDescriptor::get("/products?limit=30&skip=0"))
//!     .await?;
//!
//! match gateway.execute(RequestDescriptor::post("/carts/add").with_json(&body)?).await {
//!     Ok(response) => { /* applied */ }
//!     Err(ApiError::QueuedForSync { .. }) => { /* will sync when back online */ }
//!     Err(err) => return Err(err.into()),
//! }
//! ```

pub mod cache;
pub mod error;
pub mod gateway;
pub mod operation;
pub mod queue;
pub mod request;
pub mod retry;
pub mod session;

pub use cache::{CachedResponse, ResponseCache};
pub use error::{ApiError, Result};
pub use gateway::ApiGateway;
pub use operation::{OperationKind, ReplayableOperation};
pub use queue::{OfflineQueue, QueueItem, QueueItemId, QueuedOperation};
pub use request::{ApiResponse, RequestDescriptor, RequestIdentity, ResponseSource};
pub use retry::{AttemptFailure, AttemptOutcome, RetryDecision, RetryPolicy};
pub use session::SessionStore;
