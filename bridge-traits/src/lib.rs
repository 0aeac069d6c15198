//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the storefront core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that is provided differently per platform (desktop, iOS,
//! Android).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP transport
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity queries and change notifications
//!
//! ### Storage
//! - [`KeyValueStore`](storage::KeyValueStore) - Durable string key-value storage
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | iOS      | host adapters       | 📋 Planned |
//! | Android  | host adapters       | 📋 Planned |
//!
//! Hosts without a native connectivity API wrapper can push OS callbacks into
//! [`PushNetworkMonitor`](network::PushNetworkMonitor), and hosts that persist
//! state elsewhere can start from [`MemoryKeyValueStore`](storage::MemoryKeyValueStore).
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError` and
//! include actionable context (URL, key, probe target).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so adapters can be shared
//! across tokio tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod network;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use network::{
    NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType,
    PushNetworkMonitor,
};
pub use storage::{KeyValueStore, MemoryKeyValueStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
