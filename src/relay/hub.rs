//! Relay hub
//!
//! The single explicitly constructed owner of all shared relay state: the
//! four connection sets, the impairment configuration and the counters.
//! Connection tasks share it through an `Arc`; independent hubs never see
//! each other's peers.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};

use crate::impairment::{ImpairmentConfig, ImpairmentUpdate};
use crate::registry::{ChannelKind, Frame, PeerHandle, Registry, RelayEvent, Role};
use crate::session::SessionContext;
use crate::stats::RelayStats;

/// Default outbound queue length per peer
pub const DEFAULT_PEER_QUEUE_CAPACITY: usize = 256;

/// Shared state for every relay connection
pub struct RelayHub {
    /// Role-partitioned connection sets
    registry: Registry,

    /// Process-wide impairment settings, read and written as a unit
    impairment: RwLock<ImpairmentConfig>,

    /// Counters
    stats: RelayStats,

    /// Next session ID to allocate
    next_session_id: AtomicU64,

    /// Outbound queue length for new peers
    peer_queue_capacity: usize,
}

impl RelayHub {
    /// Create a hub with no impairment
    pub fn new() -> Self {
        Self::with_impairment(ImpairmentConfig::default())
    }

    /// Create a hub with initial impairment settings
    pub fn with_impairment(impairment: ImpairmentConfig) -> Self {
        Self {
            registry: Registry::new(),
            impairment: RwLock::new(impairment),
            stats: RelayStats::new(),
            next_session_id: AtomicU64::new(1),
            peer_queue_capacity: DEFAULT_PEER_QUEUE_CAPACITY,
        }
    }

    /// Set the outbound queue length used for new peers
    pub fn peer_queue_capacity(mut self, capacity: usize) -> Self {
        self.peer_queue_capacity = capacity.max(1);
        self
    }

    /// Get the connection registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the counters
    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Allocate a session and the outbound queue for a new connection
    ///
    /// The caller owns the returned receiver and must drain it onto the
    /// transport; dropping it marks the peer dead.
    pub fn open_session(
        &self,
        kind: ChannelKind,
        role: Role,
    ) -> (SessionContext, PeerHandle, mpsc::Receiver<Frame>) {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let (peer, rx) = PeerHandle::channel(session_id, self.peer_queue_capacity);
        self.stats.record_connection();

        (SessionContext::new(session_id, kind, role), peer, rx)
    }

    /// Current impairment settings
    pub async fn impairment(&self) -> ImpairmentConfig {
        *self.impairment.read().await
    }

    /// Apply a partial impairment update and push it to data viewers
    ///
    /// Every current data-channel viewer receives a `sim_config` event with
    /// the full resulting settings; broadcasters are not notified. Returns
    /// the resulting settings.
    pub async fn update_impairment(&self, update: ImpairmentUpdate) -> ImpairmentConfig {
        let config = {
            let mut current = self.impairment.write().await;
            *current = current.apply(update);
            *current
        };

        tracing::info!(
            loss_percent = config.loss_percent,
            latency_ms = config.latency_ms,
            "Impairment updated"
        );

        let event = Frame::event(&RelayEvent::SimConfig {
            loss_percent: config.loss_percent,
            latency_ms: config.latency_ms,
        });
        let outcome = self.registry.data_viewers().broadcast(&event).await;
        self.stats.record_evictions(outcome.removed);

        config
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}
