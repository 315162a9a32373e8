//! Signaling and data relays
//!
//! Each accepted connection runs one relay loop over its inbound frames.
//! Both channels share the same lifecycle:
//!
//! ```text
//!   open_session ──► join own set ──► peer_joined to opposite set
//!                                     (and to self if a counterpart exists)
//!        │
//!        ▼
//!   read loop: inbound frame ──► relay rules ──► opposite set
//!        │
//!        ▼
//!   stream ends ──► leave own set ──► peer_left to opposite set
//! ```
//!
//! Relay loops are generic over a `Stream` of [`Frame`]s, so the transport
//! (WebSocket in production, channels in tests) stays outside the core.

pub mod data;
pub mod hub;
pub mod signal;

pub use data::{run_data, run_data_with_rng, BroadcasterPipeline, Disposition};
pub use hub::RelayHub;
pub use signal::run_signal;

use crate::registry::{ChannelKind, Frame, PeerHandle, RelayEvent, Role};
use crate::session::SessionContext;

/// Register a connection and announce it
///
/// The opposite-role set learns about the arrival; the new connection gets
/// a single `peer_joined` of its own when a counterpart is already present.
pub(crate) async fn announce(hub: &RelayHub, ctx: &SessionContext, peer: &PeerHandle) {
    let registry = hub.registry();
    let own = registry.set(ctx.kind, ctx.role);
    let others = registry.set(ctx.kind, ctx.role.opposite());

    own.join(peer.clone()).await;

    tracing::info!(
        session_id = ctx.session_id,
        channel = %ctx.kind,
        role = %ctx.role,
        peer = ?ctx.peer_addr,
        "Peer connected"
    );

    let joined = Frame::event(&RelayEvent::PeerJoined);
    let outcome = others.broadcast(&joined).await;
    hub.stats().record_evictions(outcome.removed);

    if !others.is_empty().await && peer.send(joined).await.is_err() {
        tracing::debug!(session_id = ctx.session_id, "Peer gone before join notice");
    }
}

/// Deregister a connection and announce its departure
///
/// Delivery failures while notifying are absorbed by the registry; they
/// never hold up teardown.
pub(crate) async fn depart(hub: &RelayHub, ctx: &SessionContext) {
    let registry = hub.registry();
    registry.set(ctx.kind, ctx.role).leave(ctx.session_id).await;

    let outcome = registry
        .set(ctx.kind, ctx.role.opposite())
        .broadcast(&Frame::event(&RelayEvent::PeerLeft))
        .await;
    hub.stats().record_evictions(outcome.removed);

    tracing::info!(
        session_id = ctx.session_id,
        channel = %ctx.kind,
        role = %ctx.role,
        duration_ms = ctx.duration().as_millis() as u64,
        "Peer disconnected"
    );

    if ctx.kind == ChannelKind::Data && ctx.role == Role::Broadcaster {
        let stats = hub.stats().snapshot();
        tracing::info!(
            session_id = ctx.session_id,
            delivered = stats.binary_frames_delivered,
            dropped = stats.binary_frames_dropped,
            drop_ratio = stats.drop_ratio().unwrap_or(0.0),
            "Broadcaster stream ended"
        );
    }
}

/// Forward a frame unchanged to the opposite-role set
pub(crate) async fn forward(hub: &RelayHub, ctx: &SessionContext, frame: &Frame) {
    let outcome = hub
        .registry()
        .set(ctx.kind, ctx.role.opposite())
        .broadcast(frame)
        .await;
    hub.stats().record_evictions(outcome.removed);
}
