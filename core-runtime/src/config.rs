//! # Core Configuration Module
//!
//! Provides configuration management for the storefront core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all necessary dependencies and settings for the core library.
//! It enforces fail-fast validation to ensure all required bridges are provided
//! before initialization.
//!
//! ## Required Settings
//!
//! - `base_url` - Root of the upstream REST service (e.g. `https://dummyjson.com`)
//!
//! ## Required Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP transport (desktop default: reqwest)
//! - `KeyValueStore` - Cache, queue and session persistence (desktop default: SQLite)
//! - `NetworkMonitor` - Connectivity detection (desktop default: TCP probe)
//!
//! `Clock` is optional and defaults to the system clock.
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults are
//! injected automatically for any capability that was not provided. Without it,
//! a missing capability fails the build with [`Error::CapabilityMissing`].
//!
//! ## Usage
//!
//! ### Basic Configuration with Desktop Defaults
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .base_url("https://dummyjson.com")
//!     .database_path("/path/to/storefront.db")
//!     .build()
//!     .await?;
//! ```
//!
//! ### Configuration with Custom Bridges
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .base_url("https://dummyjson.com")
//!     .http_client(Arc::new(MyHttpClient))
//!     .kv_store(Arc::new(MyKeyValueStore))
//!     .network_monitor(Arc::new(MyNetworkMonitor))
//!     .max_retries(5)
//!     .build()
//!     .await?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, KeyValueStore, NetworkMonitor, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default transport timeout per attempt
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for linear backoff
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default freshness window for cached reads
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default number of cache entries kept in memory
pub const DEFAULT_CACHE_MEMORY_CAPACITY: usize = 128;

/// Default event bus buffer
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

const MAX_RETRIES_LIMIT: u32 = 10;
const MAX_RETRY_BASE_DELAY: Duration = Duration::from_secs(60);

/// Keys used in the key-value store.
///
/// The defaults match what the mobile client already wrote to device storage,
/// so existing installs keep their session, queue and cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Bearer token for the upstream API
    pub auth_token: String,
    /// Serialized profile of the signed-in user
    pub user_data: String,
    /// JSON array holding the persisted offline queue
    pub offline_queue: String,
    /// Prefix prepended to a request identity to form a cache key
    pub api_cache_prefix: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            auth_token: "@auth_token".to_string(),
            user_data: "@user_data".to_string(),
            offline_queue: "@offline_queue".to_string(),
            api_cache_prefix: "@api_cache_".to_string(),
        }
    }
}

impl StorageKeys {
    fn validate(&self) -> Result<()> {
        let keys = [
            ("auth_token", &self.auth_token),
            ("user_data", &self.user_data),
            ("offline_queue", &self.offline_queue),
            ("api_cache_prefix", &self.api_cache_prefix),
        ];

        for (name, key) in keys {
            if key.is_empty() {
                return Err(Error::Config(format!("Storage key '{}' cannot be empty", name)));
            }
        }

        for (name, key) in &keys[..3] {
            if key.starts_with(self.api_cache_prefix.as_str()) {
                return Err(Error::Config(format!(
                    "Storage key '{}' ({}) collides with the cache prefix '{}'",
                    name, key, self.api_cache_prefix
                )));
            }
        }

        if self.auth_token == self.user_data
            || self.auth_token == self.offline_queue
            || self.user_data == self.offline_queue
        {
            return Err(Error::Config("Storage keys must be distinct".to_string()));
        }

        Ok(())
    }
}

/// Core configuration for the storefront core.
///
/// This struct holds all dependencies and settings required to initialize
/// the core library. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Root URL of the upstream REST service, without trailing slash
    pub base_url: String,

    /// Transport timeout applied to each attempt
    pub request_timeout: Duration,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay unit for linear backoff (retry N waits N × base)
    pub retry_base_delay: Duration,

    /// Freshness window for cached reads
    pub cache_ttl: Duration,

    /// Entries held in the in-memory cache tier (0 disables it)
    pub cache_memory_capacity: usize,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// Storage key layout
    pub storage_keys: StorageKeys,

    /// HTTP transport
    pub http_client: Arc<dyn HttpClient>,

    /// Durable key-value storage
    pub kv_store: Arc<dyn KeyValueStore>,

    /// Connectivity monitor
    pub network_monitor: Arc<dyn NetworkMonitor>,

    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_memory_capacity", &self.cache_memory_capacity)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("storage_keys", &self.storage_keys)
            .field("http_client", &"HttpClient { ... }")
            .field("kv_store", &"KeyValueStore { ... }")
            .field("network_monitor", &"NetworkMonitor { ... }")
            .field("clock", &"Clock { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Base URL is an absolute http(s) URL
    /// - Timeouts and delays are non-zero and bounded
    /// - Storage keys are non-empty and do not collide
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "Base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(Error::Config(format!(
                "Max retries exceeds maximum of {}",
                MAX_RETRIES_LIMIT
            )));
        }

        if self.retry_base_delay.is_zero() {
            return Err(Error::Config(
                "Retry base delay must be greater than 0ms".to_string(),
            ));
        }

        if self.retry_base_delay > MAX_RETRY_BASE_DELAY {
            return Err(Error::Config(
                "Retry base delay exceeds maximum of 60 seconds".to_string(),
            ));
        }

        if self.cache_ttl.is_zero() {
            return Err(Error::Config(
                "Cache TTL must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        self.storage_keys.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str, mobile_hint: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: ensure the 'desktop-shims' feature is enabled to use the default. \
             Mobile: {}.",
            capability, purpose, mobile_hint
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(timeout));
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing(
        "HttpClient",
        "upstream API requests",
        "inject the platform HTTP stack (URLSession/OkHttp)",
    ))
}

#[cfg(feature = "desktop-shims")]
async fn provide_default_kv_store(
    database_path: Option<PathBuf>,
) -> Result<Arc<dyn KeyValueStore>> {
    use bridge_desktop::{default_store_path, SqliteKeyValueStore};

    let path = database_path.unwrap_or_else(default_store_path);
    let store = SqliteKeyValueStore::new(path)
        .await
        .map_err(|source| Error::BridgeInit {
            capability: "KeyValueStore".to_string(),
            source,
        })?;

    let store: Arc<dyn KeyValueStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
async fn provide_default_kv_store(
    _database_path: Option<PathBuf>,
) -> Result<Arc<dyn KeyValueStore>> {
    Err(capability_missing(
        "KeyValueStore",
        "cache, offline queue and session persistence",
        "inject platform-native storage (UserDefaults/DataStore)",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
    use bridge_desktop::DesktopNetworkMonitor;

    let monitor: Arc<dyn NetworkMonitor> = Arc::new(DesktopNetworkMonitor::new());
    Ok(monitor)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
    Err(capability_missing(
        "NetworkMonitor",
        "connectivity detection",
        "forward OS connectivity callbacks through PushNetworkMonitor",
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](CoreConfigBuilder::build) to create the final config.
/// `build` is async because the desktop key-value store opens its database.
#[derive(Default)]
pub struct CoreConfigBuilder {
    base_url: Option<String>,
    request_timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_base_delay: Option<Duration>,
    cache_ttl: Option<Duration>,
    cache_memory_capacity: Option<usize>,
    event_buffer_size: Option<usize>,
    storage_keys: Option<StorageKeys>,
    database_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    kv_store: Option<Arc<dyn KeyValueStore>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Sets the upstream base URL (required).
    ///
    /// A trailing slash is removed so paths can always start with `/`.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .base_url("https://dummyjson.com");
    /// ```
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the per-attempt transport timeout.
    ///
    /// Default: 10 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets how many retries follow a failed first attempt.
    ///
    /// Default: 3
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Sets the linear backoff unit.
    ///
    /// Default: 1000 ms
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = Some(delay);
        self
    }

    /// Sets the cache freshness window.
    ///
    /// Default: 5 minutes
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Sets the number of cache entries kept in memory.
    ///
    /// Default: 128. Zero disables the memory tier.
    pub fn cache_memory_capacity(mut self, capacity: usize) -> Self {
        self.cache_memory_capacity = Some(capacity);
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Overrides the storage key layout.
    pub fn storage_keys(mut self, keys: StorageKeys) -> Self {
        self.storage_keys = Some(keys);
        self
    }

    /// Sets where the desktop default key-value store keeps its database.
    ///
    /// Ignored when a store is injected.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .database_path("/path/to/storefront.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the key-value store implementation.
    ///
    /// If not provided, the desktop default (SQLite-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn kv_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.kv_store = Some(store);
        self
    }

    /// Sets the network monitor implementation.
    ///
    /// If not provided, the desktop default (TCP probe) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the time source (default: system clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The base URL is missing or invalid
    /// - Required bridges are missing and no desktop default is available
    /// - Configuration values are out of range
    pub async fn build(self) -> Result<CoreConfig> {
        let base_url = self.base_url.ok_or_else(|| {
            Error::Config("Base URL is required. Use .base_url() to set it.".to_string())
        })?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let kv_store = match self.kv_store {
            Some(store) => store,
            None => provide_default_kv_store(self.database_path).await?,
        };

        let network_monitor = match self.network_monitor {
            Some(monitor) => monitor,
            None => provide_default_network_monitor()?,
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let config = CoreConfig {
            base_url,
            request_timeout,
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_base_delay: self.retry_base_delay.unwrap_or(DEFAULT_RETRY_BASE_DELAY),
            cache_ttl: self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL),
            cache_memory_capacity: self
                .cache_memory_capacity
                .unwrap_or(DEFAULT_CACHE_MEMORY_CAPACITY),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            storage_keys: self.storage_keys.unwrap_or_default(),
            http_client,
            kv_store,
            network_monitor,
            clock,
        };

        config.validate()?;

        Ok(config)
    }
}
