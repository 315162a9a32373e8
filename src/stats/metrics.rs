//! Statistics for the relay hub

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Hub-wide counters
///
/// Updated with relaxed atomics from every connection task.
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    connections_accepted: AtomicU64,
    text_frames_relayed: AtomicU64,
    binary_frames_delivered: AtomicU64,
    binary_frames_dropped: AtomicU64,
    delayed_deliveries: AtomicU64,
    peers_evicted: AtomicU64,
}

impl RelayStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_accepted: AtomicU64::new(0),
            text_frames_relayed: AtomicU64::new(0),
            binary_frames_delivered: AtomicU64::new(0),
            binary_frames_dropped: AtomicU64::new(0),
            delayed_deliveries: AtomicU64::new(0),
            peers_evicted: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_connection(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_text(&self) {
        self.text_frames_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_binary_delivered(&self) {
        self.binary_frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_binary_dropped(&self) {
        self.binary_frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delayed(&self) {
        self.delayed_deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: usize) {
        if count > 0 {
            self.peers_evicted.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    /// Time since the hub was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            text_frames_relayed: self.text_frames_relayed.load(Ordering::Relaxed),
            binary_frames_delivered: self.binary_frames_delivered.load(Ordering::Relaxed),
            binary_frames_dropped: self.binary_frames_dropped.load(Ordering::Relaxed),
            delayed_deliveries: self.delayed_deliveries.load(Ordering::Relaxed),
            peers_evicted: self.peers_evicted.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable copy of [`RelayStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Seconds since the hub was created
    pub uptime_secs: u64,
    /// WebSocket connections accepted on either channel
    pub connections_accepted: u64,
    /// Text frames forwarded (events excluded)
    pub text_frames_relayed: u64,
    /// Broadcaster binary frames that reached delivery
    pub binary_frames_delivered: u64,
    /// Broadcaster binary frames dropped by the loss simulation
    pub binary_frames_dropped: u64,
    /// Deliveries deferred by injected latency
    pub delayed_deliveries: u64,
    /// Peers removed after a failed delivery
    pub peers_evicted: u64,
}

impl StatsSnapshot {
    /// Fraction of broadcaster binary frames dropped, if any were seen
    pub fn drop_ratio(&self) -> Option<f64> {
        let total = self.binary_frames_delivered + self.binary_frames_dropped;
        if total > 0 {
            Some(self.binary_frames_dropped as f64 / total as f64)
        } else {
            None
        }
    }
}
