//! Connection registry implementation
//!
//! Four independent sets of live peers, partitioned by channel and role.
//! Sets heal themselves: a peer that fails a delivery is removed.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::frame::{ChannelKind, Frame, Role};
use super::peer::PeerHandle;

/// Result of fanning a message out to a set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Peers that accepted every frame
    pub delivered: usize,
    /// Peers removed because a delivery failed
    pub removed: usize,
}

/// Set of live peers sharing a channel and role
///
/// Thread-safe via `RwLock`. Fan-out iterates over a snapshot taken at
/// broadcast time, so the lock is never held across a send.
pub struct PeerSet {
    kind: ChannelKind,
    role: Role,
    peers: RwLock<HashMap<u64, PeerHandle>>,
}

impl PeerSet {
    /// Create an empty set
    pub fn new(kind: ChannelKind, role: Role) -> Self {
        Self {
            kind,
            role,
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Channel this set belongs to
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Role of every member
    pub fn role(&self) -> Role {
        self.role
    }

    /// Add a peer
    ///
    /// A repeated join with the same ID replaces the previous handle.
    /// Returns the member count after the join.
    pub async fn join(&self, peer: PeerHandle) -> usize {
        let mut peers = self.peers.write().await;
        peers.insert(peer.id(), peer);

        tracing::debug!(
            channel = %self.kind,
            role = %self.role,
            members = peers.len(),
            "Peer joined set"
        );

        peers.len()
    }

    /// Remove a peer if present
    ///
    /// Returns whether the peer was a member. Disconnect can race with a
    /// failed delivery that already removed it, so absence is not an error.
    pub async fn leave(&self, id: u64) -> bool {
        let removed = self.peers.write().await.remove(&id).is_some();

        if removed {
            tracing::debug!(channel = %self.kind, role = %self.role, peer = id, "Peer left set");
        }

        removed
    }

    /// Whether a peer is currently a member
    pub async fn contains(&self, id: u64) -> bool {
        self.peers.read().await.contains_key(&id)
    }

    /// Number of members
    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Whether the set has no members
    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    /// Copy of the current membership
    pub async fn snapshot(&self) -> Vec<PeerHandle> {
        self.peers.read().await.values().cloned().collect()
    }

    /// Deliver a frame to every member
    pub async fn broadcast(&self, frame: &Frame) -> BroadcastOutcome {
        self.broadcast_sequence(std::slice::from_ref(frame)).await
    }

    /// Deliver a run of frames to every member, in order per member
    ///
    /// A member whose delivery fails gets none of the remaining frames and
    /// is removed from the live set once the pass completes. Other members
    /// are unaffected.
    pub async fn broadcast_sequence(&self, frames: &[Frame]) -> BroadcastOutcome {
        let targets = self.snapshot().await;
        let mut outcome = BroadcastOutcome::default();
        let mut failed = Vec::new();

        'peers: for peer in &targets {
            for frame in frames {
                if let Err(e) = peer.send(frame.clone()).await {
                    tracing::debug!(
                        channel = %self.kind,
                        role = %self.role,
                        error = %e,
                        "Delivery failed, removing peer"
                    );
                    failed.push(peer.id());
                    continue 'peers;
                }
            }
            outcome.delivered += 1;
        }

        tracing::trace!(
            channel = %self.kind,
            role = %self.role,
            frames = frames.len(),
            bytes = frames.iter().map(Frame::payload_len).sum::<usize>(),
            delivered = outcome.delivered,
            failed = failed.len(),
            "Broadcast pass complete"
        );

        if !failed.is_empty() {
            let mut peers = self.peers.write().await;
            for id in failed {
                if peers.remove(&id).is_some() {
                    outcome.removed += 1;
                }
            }
        }

        outcome
    }
}

/// The four role-partitioned connection sets
pub struct Registry {
    signal_viewers: PeerSet,
    signal_broadcasters: PeerSet,
    data_viewers: PeerSet,
    data_broadcasters: PeerSet,
}

impl Registry {
    /// Create a registry with four empty sets
    pub fn new() -> Self {
        Self {
            signal_viewers: PeerSet::new(ChannelKind::Signal, Role::Viewer),
            signal_broadcasters: PeerSet::new(ChannelKind::Signal, Role::Broadcaster),
            data_viewers: PeerSet::new(ChannelKind::Data, Role::Viewer),
            data_broadcasters: PeerSet::new(ChannelKind::Data, Role::Broadcaster),
        }
    }

    /// The set holding peers of a channel and role
    pub fn set(&self, kind: ChannelKind, role: Role) -> &PeerSet {
        match (kind, role) {
            (ChannelKind::Signal, Role::Viewer) => &self.signal_viewers,
            (ChannelKind::Signal, Role::Broadcaster) => &self.signal_broadcasters,
            (ChannelKind::Data, Role::Viewer) => &self.data_viewers,
            (ChannelKind::Data, Role::Broadcaster) => &self.data_broadcasters,
        }
    }

    /// Data-channel viewers (target of impaired delivery)
    pub fn data_viewers(&self) -> &PeerSet {
        &self.data_viewers
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
