//! Network Monitoring Abstraction
//!
//! Provides network connectivity and status information.

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use crate::error::Result;

/// Network connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    /// Cellular/mobile data connection
    Cellular,
    /// WiFi connection
    WiFi,
    /// Ethernet connection
    Ethernet,
    /// Other or unknown connection type
    Other,
}

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Connected to network
    Connected,
    /// Not connected to any network
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    pub network_type: Option<NetworkType>,
    /// Whether the connection is metered (has data limits/costs)
    pub is_metered: bool,
    /// Whether the connection is considered expensive by the OS
    pub is_expensive: bool,
}

impl NetworkInfo {
    pub fn connected(network_type: NetworkType) -> Self {
        Self {
            status: NetworkStatus::Connected,
            network_type: Some(network_type),
            is_metered: matches!(network_type, NetworkType::Cellular),
            is_expensive: false,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            status: NetworkStatus::Disconnected,
            network_type: None,
            is_metered: false,
            is_expensive: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == NetworkStatus::Connected
    }
}

/// Network monitor trait
///
/// Provides network connectivity information to allow the core to:
/// - Divert mutating requests to the offline queue
/// - Serve reads from the response cache
/// - Replay queued work when connectivity returns
///
/// # Platform Support
///
/// - **Desktop**: periodic reachability probe (`bridge-desktop`)
/// - **iOS / Android**: the host pushes OS callbacks into a [`PushNetworkMonitor`]
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// async fn should_sync(monitor: &dyn NetworkMonitor) -> bool {
///     let info = monitor.get_network_info().await.ok()?;
///     matches!(info.status, NetworkStatus::Connected) && !info.is_metered
/// }
/// ```
#[async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Get current network information
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// Check if currently connected to any network
    ///
    /// Indeterminate status and probe errors both count as offline.
    async fn is_connected(&self) -> bool {
        matches!(
            self.get_network_info().await,
            Ok(NetworkInfo {
                status: NetworkStatus::Connected,
                ..
            })
        )
    }

    /// Check if connection is metered
    async fn is_metered(&self) -> bool {
        matches!(
            self.get_network_info().await,
            Ok(NetworkInfo {
                is_metered: true,
                ..
            })
        )
    }

    /// Subscribe to network status changes
    ///
    /// Returns a stream of network info updates. Implementations should
    /// emit an event whenever network status changes. Dropping the stream
    /// ends the subscription.
    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>>;
}

/// Stream of network status changes
#[async_trait]
pub trait NetworkChangeStream: Send {
    /// Get the next network info update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<NetworkInfo>;
}

/// Network monitor fed by the host.
///
/// Mobile hosts already receive connectivity callbacks from the OS; they forward
/// each one through [`PushNetworkMonitor::update`]. Point-in-time queries read the
/// latest pushed value.
#[derive(Debug, Clone)]
pub struct PushNetworkMonitor {
    current: watch::Sender<NetworkInfo>,
    changes: broadcast::Sender<NetworkInfo>,
}

impl PushNetworkMonitor {
    pub fn new(initial: NetworkInfo) -> Self {
        let (current, _) = watch::channel(initial);
        let (changes, _) = broadcast::channel(16);
        Self { current, changes }
    }

    /// Record a new connectivity snapshot.
    ///
    /// Subscribers are only notified when the status actually changes.
    pub fn update(&self, info: NetworkInfo) {
        let changed = self.current.send_if_modified(|current| {
            if current.status == info.status {
                *current = info.clone();
                false
            } else {
                *current = info.clone();
                true
            }
        });

        if changed {
            // No subscribers is fine
            let _ = self.changes.send(info);
        }
    }

    pub fn set_online(&self) {
        self.update(NetworkInfo::connected(NetworkType::Other));
    }

    pub fn set_offline(&self) {
        self.update(NetworkInfo::disconnected());
    }

    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }
}

#[async_trait]
impl NetworkMonitor for PushNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        Ok(self.current.borrow().clone())
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
        Ok(Box::new(PushNetworkChangeStream {
            receiver: self.changes.subscribe(),
        }))
    }
}

struct PushNetworkChangeStream {
    receiver: broadcast::Receiver<NetworkInfo>,
}

impl PushNetworkChangeStream {
    fn newest_buffered(&mut self) -> Option<NetworkInfo> {
        let mut newest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(info) => newest = Some(info),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return newest,
            }
        }
    }
}

#[async_trait]
impl NetworkChangeStream for PushNetworkChangeStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        loop {
            match self.receiver.recv().await {
                Ok(info) => return Some(info),
                // A lagging listener skips straight to the newest buffered state
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    if let Some(info) = self.newest_buffered() {
                        return Some(info);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
