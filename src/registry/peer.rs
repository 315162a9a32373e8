//! Peer handles
//!
//! A peer is represented in the registry by the sending half of its
//! outbound queue. The connection's writer task owns the receiving half and
//! drains it onto the socket; once that task exits, every send fails, which
//! the registry treats as proof of a dead connection.

use tokio::sync::mpsc;

use crate::error::{Error, Result};

use super::frame::Frame;

/// Handle used to deliver frames to one connected peer
#[derive(Debug, Clone)]
pub struct PeerHandle {
    id: u64,
    tx: mpsc::Sender<Frame>,
}

impl PeerHandle {
    /// Create a handle and the outbound queue its writer drains
    pub fn channel(id: u64, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { id, tx }, rx)
    }

    /// Session ID of this peer
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue a frame for this peer
    ///
    /// Waits for queue space, so a slow peer applies backpressure to the
    /// sender. Fails only when the peer's writer has gone away.
    pub async fn send(&self, frame: Frame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| Error::PeerClosed(self.id))
    }

    /// Whether the peer's writer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
