//! Frame and role types for peer routing
//!
//! This module defines how connections are classified (role and channel)
//! and the frames that are fanned out to them.

use bytes::Bytes;
use serde::Serialize;

/// Role of a connection, decided once at upgrade time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The single sending side of a channel
    Broadcaster,
    /// A receiving side; any number may be connected
    Viewer,
}

impl Role {
    /// Classify a `role` query parameter
    ///
    /// Only the exact value `broadcaster` selects the broadcaster role;
    /// anything else, including a missing parameter, is a viewer.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("broadcaster") => Role::Broadcaster,
            _ => Role::Viewer,
        }
    }

    /// The role on the other end of the relay
    pub fn opposite(self) -> Self {
        match self {
            Role::Broadcaster => Role::Viewer,
            Role::Viewer => Role::Broadcaster,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Broadcaster => f.write_str("broadcaster"),
            Role::Viewer => f.write_str("viewer"),
        }
    }
}

/// Logical channel a connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Session negotiation (SDP/ICE), JSON only
    Signal,
    /// Application payload, text and binary, subject to impairment
    Data,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Signal => f.write_str("signal"),
            ChannelKind::Data => f.write_str("data"),
        }
    }
}

/// A unit relayed to or from a peer
///
/// Cheap to clone for binary payloads due to `Bytes` reference counting,
/// so every viewer shares one allocation of a large frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text message
    Text(String),
    /// Raw binary message
    Binary(Bytes),
}

impl Frame {
    /// Encode a server event as a text frame
    pub fn event(event: &RelayEvent) -> Self {
        // Serializing a plain tagged enum of integers cannot fail.
        Frame::Text(serde_json::to_string(event).unwrap_or_default())
    }

    /// Payload length in bytes
    pub fn payload_len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(data) => data.len(),
        }
    }

    /// Whether this is a binary frame
    pub fn is_binary(&self) -> bool {
        matches!(self, Frame::Binary(_))
    }
}

/// Events injected by the server into a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// A counterpart joined the channel
    PeerJoined,
    /// A counterpart left the channel
    PeerLeft,
    /// A binary frame was dropped by the loss simulation
    SimDrop,
    /// The impairment configuration changed
    SimConfig {
        /// Drop probability in percent
        loss_percent: u32,
        /// Added delivery latency in milliseconds
        latency_ms: u64,
    },
}
