//! Environment condition sampling for prefetch gating.
//!
//! The [`ConditionMonitor`] turns platform signals (connectivity, connection
//! quality, data-saver flag, battery) into a reactive [`ConditionSnapshot`]
//! published over a watch channel. The host application feeds signals in
//! through the setters as its platform notifications fire; the scheduler
//! re-evaluates on every change without re-subscribing.
//!
//! Every signal degrades gracefully when the platform cannot provide it:
//! the defaults assume an online, fast, unconstrained device so an absent
//! sensor never disables prefetching.

use tokio::sync::watch;
use tracing::debug;

/// Coarse connection quality classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionClass {
    /// Wi-Fi or ethernet. The optimistic default when the platform offers
    /// no classification: online implies fast rather than blocking prefetch.
    #[default]
    Wifi,
    /// Cellular, 4g-or-better bucket.
    Cellular4g,
    /// Cellular, 3g bucket.
    Cellular3g,
    /// Cellular, 2g-or-slower bucket.
    Cellular2g,
}

impl ConnectionClass {
    /// Whether this counts as a Wi-Fi-class (unmetered) connection.
    pub fn is_wifi_class(self) -> bool {
        matches!(self, Self::Wifi)
    }

    /// Whether the connection is fast enough for an aggressive window.
    pub fn is_fast(self) -> bool {
        matches!(self, Self::Wifi | Self::Cellular4g)
    }
}

impl std::fmt::Display for ConnectionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wifi => write!(f, "wifi"),
            Self::Cellular4g => write!(f, "4g"),
            Self::Cellular3g => write!(f, "3g"),
            Self::Cellular2g => write!(f, "2g"),
        }
    }
}

/// Best-effort snapshot of the device's network and power conditions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionSnapshot {
    pub is_online: bool,
    pub connection: ConnectionClass,
    /// Measured downlink estimate in megabits per second.
    pub downlink_mbps: f64,
    /// Measured round-trip time estimate in milliseconds.
    pub rtt_ms: u32,
    /// Data-saver preference is on; prefetch must not burn quota.
    pub data_saver: bool,
    /// Battery level, 0-100.
    pub battery_percent: u8,
    pub is_charging: bool,
}

impl Default for ConditionSnapshot {
    fn default() -> Self {
        Self {
            is_online: true,
            connection: ConnectionClass::Wifi,
            downlink_mbps: 10.0,
            rtt_ms: 50,
            data_saver: false,
            battery_percent: 100,
            is_charging: false,
        }
    }
}

impl ConditionSnapshot {
    /// Whether conditions allow an aggressive prefetch window.
    pub fn is_fast(&self) -> bool {
        self.connection.is_fast()
    }
}

/// Reactive monitor publishing condition snapshots to subscribers.
#[derive(Debug)]
pub struct ConditionMonitor {
    tx: watch::Sender<ConditionSnapshot>,
}

impl ConditionMonitor {
    /// Create a monitor with optimistic defaults.
    pub fn new() -> Self {
        Self::with_snapshot(ConditionSnapshot::default())
    }

    /// Create a monitor seeded with a known snapshot.
    pub fn with_snapshot(snapshot: ConditionSnapshot) -> Self {
        let (tx, _) = watch::channel(snapshot);
        Self { tx }
    }

    /// Subscribe to condition changes.
    ///
    /// The receiver observes every subsequent update; callers never need to
    /// re-subscribe.
    pub fn subscribe(&self) -> watch::Receiver<ConditionSnapshot> {
        self.tx.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ConditionSnapshot {
        *self.tx.borrow()
    }

    /// Feed a connectivity transition.
    pub fn set_online(&self, is_online: bool) {
        debug!(is_online, "connectivity changed");
        self.tx.send_modify(|s| s.is_online = is_online);
    }

    /// Feed a connection quality reading.
    pub fn set_connection(&self, connection: ConnectionClass, downlink_mbps: f64, rtt_ms: u32) {
        debug!(%connection, downlink_mbps, rtt_ms, "connection quality changed");
        self.tx.send_modify(|s| {
            s.connection = connection;
            s.downlink_mbps = downlink_mbps;
            s.rtt_ms = rtt_ms;
        });
    }

    /// Feed the data-saver preference.
    pub fn set_data_saver(&self, data_saver: bool) {
        debug!(data_saver, "data saver preference changed");
        self.tx.send_modify(|s| s.data_saver = data_saver);
    }

    /// Feed a battery reading.
    pub fn set_battery(&self, battery_percent: u8, is_charging: bool) {
        debug!(battery_percent, is_charging, "battery state changed");
        self.tx.send_modify(|s| {
            s.battery_percent = battery_percent.min(100);
            s.is_charging = is_charging;
        });
    }
}

impl Default for ConditionMonitor {
    fn default() -> Self {
        Self::new()
    }
}
