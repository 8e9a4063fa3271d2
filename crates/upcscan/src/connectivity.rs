//! Connectivity monitoring.
//!
//! A [`ConnectivityProbe`] answers "are we online right now?". The
//! [`ConnectivityMonitor`] remembers the last answer and reports only
//! transitions, and [`watch`] polls a probe in the background and forwards
//! those transitions as events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// A change in network reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectivityEvent {
    /// The network became reachable.
    Online,
    /// The network became unreachable.
    Offline,
}

impl ConnectivityEvent {
    /// The event announcing `online`.
    #[must_use]
    pub fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    /// Whether this event means the network is reachable.
    #[must_use]
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl std::fmt::Display for ConnectivityEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// A check for network reachability.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Check whether the network is currently reachable.
    async fn is_online(&self) -> bool;
}

/// Probe that opens a TCP connection to a fixed host and port.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    /// Create a probe for `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Create a probe for the host and port of `url`.
    ///
    /// Returns `None` if the URL has no host or no known port.
    #[must_use]
    pub fn for_url(url: &reqwest::Url, timeout: Duration) -> Option<Self> {
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Self::new(host, port, timeout))
    }

    /// The probed address as `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_online(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                trace!(address = %self.address(), error = %e, "Connectivity probe failed");
                false
            }
            Err(_) => {
                trace!(address = %self.address(), "Connectivity probe timed out");
                false
            }
        }
    }
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn is_online(&self) -> bool {
        self.0
    }
}

/// Tracks the current reachability and reports transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityMonitor {
    online: bool,
}

impl ConnectivityMonitor {
    /// Create a monitor with a known initial state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self { online }
    }

    /// Create a monitor initialized from one probe run.
    pub async fn from_probe(probe: &dyn ConnectivityProbe) -> Self {
        Self::new(probe.is_online().await)
    }

    /// The last known state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Record a fresh observation.
    ///
    /// Returns the event to emit when the state changed.
    pub fn update(&mut self, online: bool) -> Option<ConnectivityEvent> {
        if online == self.online {
            return None;
        }
        self.online = online;
        Some(ConnectivityEvent::from_online(online))
    }
}

/// A handle to stop a background watcher.
///
/// Clones share the same stop signal.
#[derive(Debug, Clone, Default)]
pub struct WatchHandle {
    stop_signal: Arc<AtomicBool>,
}

impl WatchHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the watcher to stop.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }
}

/// Poll `probe` every `interval` and send transitions through `tx`.
///
/// `monitor` holds the state the caller already knows about, so only
/// changes relative to it are sent. The task ends when `handle` is stopped
/// or the receiver is dropped.
pub fn watch<P, T>(
    probe: P,
    mut monitor: ConnectivityMonitor,
    interval: Duration,
    tx: mpsc::Sender<T>,
    handle: WatchHandle,
) -> JoinHandle<()>
where
    P: ConnectivityProbe + 'static,
    T: From<ConnectivityEvent> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; the caller already probed.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if handle.should_stop() {
                debug!("Connectivity watcher stopped");
                break;
            }

            let online = probe.is_online().await;
            if let Some(event) = monitor.update(online) {
                info!(%event, "Connectivity changed");
                if tx.send(T::from(event)).await.is_err() {
                    break;
                }
            }
        }
    })
}
