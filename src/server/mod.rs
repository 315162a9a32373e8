//! HTTP/WebSocket shell around the relay hub
//!
//! Routes:
//! - `WS  /ws/signal?role=…`: signaling relay
//! - `WS  /ws/tcp?role=…` (alias `/ws/data`): data relay with impairment
//! - `GET/POST /api/simulate`: impairment settings
//! - `GET /api/stats`: relay counters
//! - `GET /broadcast-url`: broadcaster join URL
//! - `/`, `/broadcast`, `/static/*`: pages and assets when a static
//!   directory is configured

pub mod api;
pub mod config;
pub mod listener;
pub mod net;
pub mod ws;

pub use config::ServerConfig;
pub use listener::RelayServer;
