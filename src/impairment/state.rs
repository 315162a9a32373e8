//! Per-connection impairment state machine
//!
//! Pairs timestamp tags with the following binary frame and decides, frame
//! by frame, whether that unit is dropped or delivered (and after what
//! delay). One instance belongs to one broadcaster connection's read loop.

use std::time::Duration;

use rand::Rng;

use super::config::ImpairmentConfig;

/// Why a binary frame was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropCause {
    /// Continuation of an earlier probabilistic drop
    Burst,
    /// A fresh probabilistic drop that starts a new burst
    Loss,
}

/// Outcome of evaluating one binary frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Discard the frame and any paired timestamp
    Drop(DropCause),
    /// Deliver the frame, preceded by its timestamp tag if one was paired
    Deliver {
        /// Raw text of the paired timestamp tag
        timestamp: Option<String>,
        /// Delay before delivery; zero means deliver inline
        delay: Duration,
    },
}

/// Transient state driving drop and delay decisions
#[derive(Debug, Default)]
pub struct BurstState {
    /// Frames still to be dropped as part of the current burst
    burst_remaining: u8,
    /// Timestamp tag waiting for its binary frame
    pending_timestamp: Option<String>,
}

impl BurstState {
    /// Create an idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames still to be dropped by the current burst
    pub fn burst_remaining(&self) -> u8 {
        self.burst_remaining
    }

    /// Timestamp tag waiting for its binary frame
    pub fn pending_timestamp(&self) -> Option<&str> {
        self.pending_timestamp.as_deref()
    }

    /// Hold a timestamp tag until the next binary frame
    ///
    /// Only one slot exists; a newer tag replaces an unpaired older one.
    pub fn stash_timestamp(&mut self, raw: String) {
        self.pending_timestamp = Some(raw);
    }

    /// Evaluate the next binary frame
    ///
    /// The pending timestamp is consumed whatever the outcome. Checks run
    /// in a fixed order: burst continuation, then the random loss draw,
    /// then delivery.
    pub fn decide<R: Rng>(&mut self, config: &ImpairmentConfig, rng: &mut R) -> Decision {
        let timestamp = self.pending_timestamp.take();

        if self.burst_remaining > 0 {
            self.burst_remaining -= 1;
            return Decision::Drop(DropCause::Burst);
        }

        if config.loss_percent > 0 && rng.gen::<f64>() * 100.0 < f64::from(config.loss_percent) {
            self.burst_remaining = rng.gen_range(1..=2);
            return Decision::Drop(DropCause::Loss);
        }

        Decision::Deliver {
            timestamp,
            delay: config.delay(),
        }
    }
}

/// Whether a text frame is a timestamp tag (`{"type":"ts", ...}`)
pub fn is_timestamp_tag(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| value.get("type").and_then(|t| t.as_str()).map(|t| t == "ts"))
        .unwrap_or(false)
}
