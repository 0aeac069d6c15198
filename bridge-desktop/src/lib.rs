//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `KeyValueStore` using SQLite via `sqlx`
//! - `NetworkMonitor` using a TCP reachability probe
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopNetworkMonitor, ReqwestHttpClient, SqliteKeyValueStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new();
//!     let store = SqliteKeyValueStore::new(data_dir.join("storefront.db")).await?;
//!     let monitor = DesktopNetworkMonitor::new();
//!
//!     // Use in core configuration
//! }
//! ```

mod http;
mod kv_store;
mod network;

pub use http::{ReqwestHttpClient, DEFAULT_TIMEOUT};
pub use kv_store::SqliteKeyValueStore;
pub use network::DesktopNetworkMonitor;

/// Default location of the desktop key-value database.
///
/// Falls back to the working directory when the platform has no data dir.
pub fn default_store_path() -> std::path::PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("storefront-core")
        .join("storefront.db")
}
