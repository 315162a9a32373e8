//! Session context
//!
//! Identity of one upgraded connection, fixed for its lifetime.

use std::net::SocketAddr;
use std::time::Instant;

use crate::registry::{ChannelKind, Role};

/// Read-only information about a connection
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID (registry key)
    pub session_id: u64,

    /// Role decided at upgrade time
    pub role: Role,

    /// Channel the connection relays on
    pub kind: ChannelKind,

    /// Remote peer address, when the transport exposes it
    pub peer_addr: Option<SocketAddr>,

    /// When the connection was accepted
    pub connected_at: Instant,
}

impl SessionContext {
    /// Create a new context
    pub fn new(session_id: u64, kind: ChannelKind, role: Role) -> Self {
        Self {
            session_id,
            role,
            kind,
            peer_addr: None,
            connected_at: Instant::now(),
        }
    }

    /// Attach the remote address
    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Time since the connection was accepted
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}
