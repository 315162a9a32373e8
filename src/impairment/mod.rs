//! Simulated network impairment for the data channel
//!
//! This module provides:
//! - The operator-facing loss/latency configuration
//! - Parsing of partial, loosely typed configuration updates
//! - The per-broadcaster burst-loss and timestamp-pairing state machine

pub mod config;
pub mod state;

pub use config::{ImpairmentConfig, ImpairmentUpdate};
pub use state::{is_timestamp_tag, BurstState, Decision, DropCause};
