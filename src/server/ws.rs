//! WebSocket transport for the relays
//!
//! Each upgraded socket is split in two: a writer task drains the peer's
//! outbound queue onto the socket, and the relay loop consumes inbound
//! messages as [`Frame`]s. Close frames and socket errors end the inbound
//! stream; ping/pong is handled by the WebSocket layer.

use std::future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, Stream, StreamExt};
use serde::Deserialize;

use crate::registry::{ChannelKind, Frame, Role};
use crate::relay::{run_data, run_signal, RelayHub};

use super::listener::AppState;

/// Query parameters accepted on both channel endpoints
#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    /// `broadcaster`; anything else connects as a viewer
    pub role: Option<String>,
}

/// `GET /ws/signal` upgrade handler
pub(crate) async fn signal_upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<RoleQuery>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let role = Role::from_query(query.role.as_deref());
    ws.max_message_size(state.config.signal_max_message_size)
        .on_upgrade(move |socket| serve_socket(socket, state.hub, ChannelKind::Signal, role, addr))
}

/// `GET /ws/tcp` (and `/ws/data`) upgrade handler
pub(crate) async fn data_upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<RoleQuery>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let role = Role::from_query(query.role.as_deref());
    let limit = state.config.max_message_size;
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| serve_socket(socket, state.hub, ChannelKind::Data, role, addr))
}

/// Relay one upgraded socket until it closes
pub async fn serve_socket(
    socket: WebSocket,
    hub: Arc<RelayHub>,
    kind: ChannelKind,
    role: Role,
    addr: SocketAddr,
) {
    let (ctx, peer, mut outbound) = hub.open_session(kind, role);
    let ctx = ctx.with_peer_addr(addr);
    let session_id = ctx.session_id;
    let (mut sink, stream) = socket.split();

    // Ends once every handle to this peer is gone or the socket breaks.
    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = sink.send(into_message(frame)).await {
                tracing::debug!(session_id = session_id, error = %e, "WebSocket write failed");
                return;
            }
        }
        let _ = sink.close().await;
    });

    let inbound = Box::pin(inbound_frames(session_id, stream));
    match kind {
        ChannelKind::Signal => run_signal(hub, ctx, peer, inbound).await,
        ChannelKind::Data => run_data(hub, ctx, peer, inbound).await,
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(data) => Message::Binary(data),
    }
}

/// Adapt a socket's message stream to relay frames
fn inbound_frames<S>(session_id: u64, stream: S) -> impl Stream<Item = Frame> + Send
where
    S: Stream<Item = Result<Message, axum::Error>> + Send,
{
    stream
        .take_while(move |msg| {
            let open = match msg {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(session_id = session_id, error = %e, "WebSocket read failed");
                    false
                }
            };
            future::ready(open)
        })
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Frame::Text(text.as_str().to_owned())),
                Ok(Message::Binary(data)) => Some(Frame::Binary(data)),
                _ => None,
            })
        })
}
