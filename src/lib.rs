//! Broadcaster/viewer relay with simulated network impairment
//!
//! One broadcaster and any number of viewers connect over two WebSocket
//! channels:
//!
//! - **signal**: JSON session-negotiation messages (SDP, ICE) relayed
//!   verbatim between the broadcaster and every viewer
//! - **data**: text and binary frames; the broadcaster's binary frames pass
//!   through a loss/latency simulator before reaching viewers
//!
//! # Example
//! ```no_run
//! use sim_relay::{RelayServer, ServerConfig};
//!
//! # async fn example() -> sim_relay::error::Result<()> {
//! let config = ServerConfig::with_addr("0.0.0.0:8443".parse().unwrap());
//! let server = RelayServer::new(config);
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod impairment;
pub mod registry;
pub mod relay;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use impairment::{ImpairmentConfig, ImpairmentUpdate};
pub use registry::{ChannelKind, Frame, RelayEvent, Role};
pub use relay::RelayHub;
pub use server::{RelayServer, ServerConfig};
