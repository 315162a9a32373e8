//! Connection registry for role-partitioned fan-out
//!
//! The registry keeps four sets of live peers and delivers frames from one
//! role to every peer of the opposite role on the same channel.
//!
//! # Architecture
//!
//! ```text
//!                            Registry
//!          ┌──────────────────────────────────────────┐
//!          │ signal: { broadcasters }  { viewers }    │
//!          │ data:   { broadcasters }  { viewers }    │
//!          └───────────────────┬──────────────────────┘
//!                              │ snapshot + send
//!         ┌────────────────────┼────────────────────┐
//!         ▼                    ▼                    ▼
//!    PeerHandle           PeerHandle           PeerHandle
//!    mpsc::Sender         mpsc::Sender         mpsc::Sender
//!         │                    │                    │
//!    writer task ──► WS   writer task ──► WS   writer task ──► WS
//! ```
//!
//! # Zero-Copy Design
//!
//! Binary frames carry `bytes::Bytes`, so fanning a megabyte payload out to
//! many viewers clones a reference count, not the data.

pub mod frame;
pub mod peer;
pub mod store;

pub use frame::{ChannelKind, Frame, RelayEvent, Role};
pub use peer::PeerHandle;
pub use store::{BroadcastOutcome, PeerSet, Registry};
