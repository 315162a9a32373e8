//! Signaling relay
//!
//! Relays session-negotiation messages (SDP offers/answers, ICE candidates)
//! between the broadcaster and every viewer. Messages must be JSON; they are
//! forwarded exactly as received once they decode. A message that fails to
//! decode is dropped before any fan-out.

use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::registry::{Frame, PeerHandle};
use crate::session::{SessionContext, SessionState};

use super::hub::RelayHub;

/// Run the signaling relay for one connection until its stream ends
pub async fn run_signal<S>(hub: Arc<RelayHub>, ctx: SessionContext, peer: PeerHandle, mut inbound: S)
where
    S: Stream<Item = Frame> + Unpin,
{
    let mut session = SessionState::new();
    super::announce(&hub, &ctx, &peer).await;

    while let Some(frame) = inbound.next().await {
        match frame {
            Frame::Text(text) => {
                if let Err(e) = serde_json::from_str::<serde_json::Value>(&text) {
                    tracing::debug!(
                        session_id = ctx.session_id,
                        error = %e,
                        "Discarding malformed signaling message"
                    );
                    continue;
                }
                hub.stats().record_text();
                super::forward(&hub, &ctx, &Frame::Text(text)).await;
            }
            Frame::Binary(data) => {
                tracing::trace!(
                    session_id = ctx.session_id,
                    len = data.len(),
                    "Ignoring binary frame on signaling channel"
                );
            }
        }
    }

    if session.close() {
        super::depart(&hub, &ctx).await;
    }
}
