//! Data relay
//!
//! Broadcaster → viewers traffic passes through the impairment pipeline:
//!
//! ```text
//!   text {"type":"ts"} ──► stash as pending timestamp
//!   other text         ──► forward now
//!   binary ──► burst_remaining > 0 ? ──yes──► sim_drop
//!                    │ no
//!                    ▼
//!              loss draw hits ?   ──yes──► start burst, sim_drop
//!                    │ no
//!                    ▼
//!              [ts] + binary ──► deliver now, or after latency_ms
//!                                 in a detached task
//! ```
//!
//! Viewer → broadcaster traffic is forwarded untouched.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::impairment::{is_timestamp_tag, BurstState, Decision, DropCause};
use crate::registry::{Frame, PeerHandle, RelayEvent, Role};
use crate::session::{SessionContext, SessionState};

use super::hub::RelayHub;

/// What the broadcaster pipeline did with one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Timestamp tag held for the next binary frame
    TimestampHeld,
    /// Text forwarded to viewers
    Forwarded,
    /// Binary frame discarded by the loss simulation
    Dropped(DropCause),
    /// Binary frame delivered before returning
    Delivered,
    /// Binary frame handed to a delayed delivery task
    Scheduled(Duration),
}

/// Impairment pipeline for one broadcaster connection
///
/// Owns that connection's burst state; nothing else touches it.
pub struct BroadcasterPipeline<R> {
    hub: Arc<RelayHub>,
    state: BurstState,
    rng: R,
}

impl<R: Rng> BroadcasterPipeline<R> {
    /// Create a pipeline drawing loss decisions from `rng`
    pub fn new(hub: Arc<RelayHub>, rng: R) -> Self {
        Self {
            hub,
            state: BurstState::new(),
            rng,
        }
    }

    /// Burst and timestamp state
    pub fn state(&self) -> &BurstState {
        &self.state
    }

    /// Process one inbound frame from the broadcaster
    ///
    /// Returns once the frame is fully handled, except that a delayed
    /// delivery runs on its own task and is not awaited.
    pub async fn handle(&mut self, frame: Frame) -> Disposition {
        match frame {
            Frame::Text(text) => {
                if is_timestamp_tag(&text) {
                    self.state.stash_timestamp(text);
                    return Disposition::TimestampHeld;
                }
                self.hub.stats().record_text();
                let outcome = self
                    .hub
                    .registry()
                    .data_viewers()
                    .broadcast(&Frame::Text(text))
                    .await;
                self.hub.stats().record_evictions(outcome.removed);
                Disposition::Forwarded
            }
            Frame::Binary(payload) => self.handle_binary(payload).await,
        }
    }

    async fn handle_binary(&mut self, payload: Bytes) -> Disposition {
        let config = self.hub.impairment().await;

        match self.state.decide(&config, &mut self.rng) {
            Decision::Drop(cause) => {
                tracing::trace!(
                    ?cause,
                    len = payload.len(),
                    burst_remaining = self.state.burst_remaining(),
                    "Simulated drop"
                );
                self.hub.stats().record_binary_dropped();
                let outcome = self
                    .hub
                    .registry()
                    .data_viewers()
                    .broadcast(&Frame::event(&RelayEvent::SimDrop))
                    .await;
                self.hub.stats().record_evictions(outcome.removed);
                Disposition::Dropped(cause)
            }
            Decision::Deliver { timestamp, delay } if delay.is_zero() => {
                deliver(&self.hub, timestamp, payload).await;
                Disposition::Delivered
            }
            Decision::Deliver { timestamp, delay } => {
                self.hub.stats().record_delayed();
                let hub = Arc::clone(&self.hub);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    deliver(&hub, timestamp, payload).await;
                });
                Disposition::Scheduled(delay)
            }
        }
    }
}

/// Send a timestamp/payload unit to the data viewers present right now
async fn deliver(hub: &RelayHub, timestamp: Option<String>, payload: Bytes) {
    let mut frames = Vec::with_capacity(2);
    if let Some(ts) = timestamp {
        frames.push(Frame::Text(ts));
    }
    frames.push(Frame::Binary(payload));

    hub.stats().record_binary_delivered();
    let outcome = hub.registry().data_viewers().broadcast_sequence(&frames).await;
    hub.stats().record_evictions(outcome.removed);
}

/// Run the data relay for one connection until its stream ends
pub async fn run_data<S>(hub: Arc<RelayHub>, ctx: SessionContext, peer: PeerHandle, inbound: S)
where
    S: Stream<Item = Frame> + Unpin,
{
    run_data_with_rng(hub, ctx, peer, inbound, StdRng::from_entropy()).await
}

/// Run the data relay with a caller-supplied random source
pub async fn run_data_with_rng<S, R>(
    hub: Arc<RelayHub>,
    ctx: SessionContext,
    peer: PeerHandle,
    mut inbound: S,
    rng: R,
) where
    S: Stream<Item = Frame> + Unpin,
    R: Rng,
{
    let mut session = SessionState::new();
    super::announce(&hub, &ctx, &peer).await;

    match ctx.role {
        Role::Broadcaster => {
            let mut pipeline = BroadcasterPipeline::new(Arc::clone(&hub), rng);
            while let Some(frame) = inbound.next().await {
                pipeline.handle(frame).await;
            }
        }
        Role::Viewer => {
            while let Some(frame) = inbound.next().await {
                if !frame.is_binary() {
                    hub.stats().record_text();
                }
                super::forward(&hub, &ctx, &frame).await;
            }
        }
    }

    if session.close() {
        super::depart(&hub, &ctx).await;
    }
}

#[cfg(test)]
mod tests {
    use futures::channel::mpsc::unbounded;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    use super::*;
    use crate::impairment::{ImpairmentConfig, ImpairmentUpdate};
    use crate::registry::ChannelKind;
    use crate::relay::test_support::{drain, event_type, next_frame, settle};

    const TS: &str = r#"{"type":"ts","t":1712345678.25}"#;

    async fn viewer(hub: &RelayHub) -> mpsc::Receiver<Frame> {
        let (_, peer, rx) = hub.open_session(ChannelKind::Data, Role::Viewer);
        hub.registry().data_viewers().join(peer).await;
        rx
    }

    fn pipeline(hub: &Arc<RelayHub>) -> BroadcasterPipeline<StdRng> {
        BroadcasterPipeline::new(Arc::clone(hub), StdRng::seed_from_u64(42))
    }

    fn binary(len: usize) -> Frame {
        Frame::Binary(Bytes::from(vec![0xAB; len]))
    }

    #[tokio::test]
    async fn test_unimpaired_delivery_to_all_viewers() {
        let hub = Arc::new(RelayHub::new());
        let mut v1 = viewer(&hub).await;
        let mut v2 = viewer(&hub).await;
        let mut pipeline = pipeline(&hub);

        let payload = Frame::Binary(Bytes::from_static(b"0123456789"));
        assert_eq!(pipeline.handle(payload.clone()).await, Disposition::Delivered);

        for rx in [&mut v1, &mut v2] {
            assert_eq!(drain(rx), vec![payload.clone()]);
        }
    }

    #[tokio::test]
    async fn test_timestamp_precedes_paired_binary() {
        let hub = Arc::new(RelayHub::new());
        let mut rx = viewer(&hub).await;
        let mut pipeline = pipeline(&hub);

        assert_eq!(pipeline.handle(Frame::Text(TS.into())).await, Disposition::TimestampHeld);
        assert!(drain(&mut rx).is_empty());

        pipeline.handle(binary(4)).await;

        assert_eq!(drain(&mut rx), vec![Frame::Text(TS.into()), binary(4)]);
        assert!(pipeline.state().pending_timestamp().is_none());
    }

    #[tokio::test]
    async fn test_timestamp_discarded_with_dropped_frame() {
        let hub = Arc::new(RelayHub::with_impairment(ImpairmentConfig::new(100, 0)));
        let mut rx = viewer(&hub).await;
        let mut pipeline = pipeline(&hub);

        pipeline.handle(Frame::Text(TS.into())).await;
        assert_eq!(pipeline.handle(binary(8)).await, Disposition::Dropped(DropCause::Loss));

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(event_type(&frames[0]).as_deref(), Some("sim_drop"));
        assert!(pipeline.state().pending_timestamp().is_none());
    }

    #[tokio::test]
    async fn test_plain_text_forwarded_immediately() {
        let hub = Arc::new(RelayHub::with_impairment(ImpairmentConfig::new(100, 500)));
        let mut rx = viewer(&hub).await;
        let mut pipeline = pipeline(&hub);

        let chat = Frame::Text(r#"{"type":"meta","fps":30}"#.into());
        assert_eq!(pipeline.handle(chat.clone()).await, Disposition::Forwarded);
        assert_eq!(pipeline.handle(Frame::Text("raw".into())).await, Disposition::Forwarded);

        assert_eq!(drain(&mut rx), vec![chat, Frame::Text("raw".into())]);
    }

    #[tokio::test]
    async fn test_burst_follows_drop() {
        let hub = Arc::new(RelayHub::with_impairment(ImpairmentConfig::new(100, 0)));
        let mut rx = viewer(&hub).await;
        let mut pipeline = pipeline(&hub);

        assert_eq!(pipeline.handle(binary(1)).await, Disposition::Dropped(DropCause::Loss));
        let burst = pipeline.state().burst_remaining();
        assert!((1..=2).contains(&burst));

        // Switch loss off: the burst still runs out first.
        hub.update_impairment(ImpairmentUpdate {
            loss_percent: Some(0),
            latency_ms: None,
        })
        .await;
        drain(&mut rx);

        for _ in 0..burst {
            assert_eq!(pipeline.handle(binary(1)).await, Disposition::Dropped(DropCause::Burst));
        }
        assert_eq!(pipeline.handle(binary(1)).await, Disposition::Delivered);

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), burst as usize + 1);
        assert!(frames[..burst as usize]
            .iter()
            .all(|f| event_type(f).as_deref() == Some("sim_drop")));
        assert_eq!(frames[burst as usize], binary(1));

        let stats = hub.stats().snapshot();
        assert_eq!(stats.binary_frames_dropped, burst as u64 + 1);
        assert_eq!(stats.binary_frames_delivered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_does_not_block_reads() {
        let hub = Arc::new(RelayHub::with_impairment(ImpairmentConfig::new(0, 200)));
        let mut rx = viewer(&hub).await;
        let mut pipeline = pipeline(&hub);
        let start = Instant::now();

        pipeline.handle(Frame::Text(TS.into())).await;
        let first = pipeline.handle(binary(16)).await;
        let second = pipeline.handle(binary(32)).await;

        assert_eq!(first, Disposition::Scheduled(Duration::from_millis(200)));
        assert_eq!(second, Disposition::Scheduled(Duration::from_millis(200)));
        // Both frames were accepted without waiting on the clock.
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(drain(&mut rx).is_empty());

        let mut frames = vec![next_frame(&mut rx).await];
        assert!(start.elapsed() >= Duration::from_millis(200));
        frames.push(next_frame(&mut rx).await);
        frames.push(next_frame(&mut rx).await);

        // The two delayed tasks may finish in either order, but the paired
        // timestamp always precedes its own payload.
        let position = |frame: &Frame| frames.iter().position(|f| f == frame);
        let ts_at = position(&Frame::Text(TS.into())).expect("timestamp delivered");
        let first_at = position(&binary(16)).expect("first payload delivered");
        assert!(ts_at < first_at);
        assert!(position(&binary(32)).is_some());
        assert_eq!(hub.stats().snapshot().delayed_deliveries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_delivery_skips_departed_viewer() {
        let hub = Arc::new(RelayHub::with_impairment(ImpairmentConfig::new(0, 100)));
        let (_, leaving, _leaving_rx) = hub.open_session(ChannelKind::Data, Role::Viewer);
        let leaving_id = leaving.id();
        hub.registry().data_viewers().join(leaving).await;
        let mut staying = viewer(&hub).await;
        let mut pipeline = pipeline(&hub);

        pipeline.handle(binary(3)).await;
        hub.registry().data_viewers().leave(leaving_id).await;

        assert_eq!(next_frame(&mut staying).await, binary(3));
        assert_eq!(hub.stats().snapshot().peers_evicted, 0);
    }

    #[tokio::test]
    async fn test_dead_viewer_does_not_abort_delivery() {
        let hub = Arc::new(RelayHub::new());
        let dead = viewer(&hub).await;
        let mut alive = viewer(&hub).await;
        drop(dead);
        let mut pipeline = pipeline(&hub);

        pipeline.handle(Frame::Text(TS.into())).await;
        pipeline.handle(binary(5)).await;

        assert_eq!(drain(&mut alive), vec![Frame::Text(TS.into()), binary(5)]);
        assert_eq!(hub.registry().data_viewers().len().await, 1);
        assert_eq!(hub.stats().snapshot().peers_evicted, 1);
    }

    #[tokio::test]
    async fn test_viewer_traffic_reaches_broadcasters_unimpaired() {
        let hub = Arc::new(RelayHub::with_impairment(ImpairmentConfig::new(100, 1000)));
        let (b_ctx, b_peer, mut b_out) = hub.open_session(ChannelKind::Data, Role::Broadcaster);
        let (b_in, b_inbound) = unbounded();
        tokio::spawn(run_data(Arc::clone(&hub), b_ctx, b_peer, b_inbound));
        settle().await;

        let (v_ctx, v_peer, mut v_out) = hub.open_session(ChannelKind::Data, Role::Viewer);
        let (v_in, v_inbound) = unbounded();
        tokio::spawn(run_data(Arc::clone(&hub), v_ctx, v_peer, v_inbound));

        assert_eq!(event_type(&next_frame(&mut b_out).await).as_deref(), Some("peer_joined"));
        assert_eq!(event_type(&next_frame(&mut v_out).await).as_deref(), Some("peer_joined"));

        v_in.unbounded_send(Frame::Text(TS.into())).unwrap();
        v_in.unbounded_send(binary(7)).unwrap();

        assert_eq!(next_frame(&mut b_out).await, Frame::Text(TS.into()));
        assert_eq!(next_frame(&mut b_out).await, binary(7));

        drop(b_in);
        assert_eq!(event_type(&next_frame(&mut v_out).await).as_deref(), Some("peer_left"));
    }

    #[tokio::test]
    async fn test_large_frames_share_one_allocation() {
        let hub = Arc::new(RelayHub::new());
        let mut v1 = viewer(&hub).await;
        let mut v2 = viewer(&hub).await;
        let mut pipeline = pipeline(&hub);

        let payload = Bytes::from(vec![7u8; 4 * 1024 * 1024]);
        pipeline.handle(Frame::Binary(payload.clone())).await;

        let (Frame::Binary(a), Frame::Binary(b)) = (next_frame(&mut v1).await, next_frame(&mut v2).await)
        else {
            panic!("expected binary frames");
        };
        assert_eq!(a.len(), payload.len());
        assert_eq!(a.as_ptr(), payload.as_ptr());
        assert_eq!(b.as_ptr(), payload.as_ptr());
    }
}
