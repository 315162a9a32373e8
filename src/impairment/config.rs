//! Impairment configuration
//!
//! Loss probability and added latency applied to the broadcaster's binary
//! frames on the data channel.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Network conditions simulated on the data channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpairmentConfig {
    /// Probability in percent that an eligible binary frame is dropped
    ///
    /// Values above 100 are accepted and drop every eligible frame.
    pub loss_percent: u32,

    /// Delay added before a delivered frame reaches viewers
    pub latency_ms: u64,
}

impl ImpairmentConfig {
    /// Create a config with the given loss and latency
    pub fn new(loss_percent: u32, latency_ms: u64) -> Self {
        Self {
            loss_percent,
            latency_ms,
        }
    }

    /// Set the loss percentage
    pub fn loss_percent(mut self, percent: u32) -> Self {
        self.loss_percent = percent;
        self
    }

    /// Set the added latency
    pub fn latency_ms(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    /// Added latency as a duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Apply a partial update, keeping fields the update leaves out
    pub fn apply(self, update: ImpairmentUpdate) -> Self {
        Self {
            loss_percent: update.loss_percent.unwrap_or(self.loss_percent),
            latency_ms: update.latency_ms.unwrap_or(self.latency_ms),
        }
    }
}

/// Partial configuration change submitted by an operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImpairmentUpdate {
    /// New loss percentage, if supplied
    pub loss_percent: Option<u32>,
    /// New latency, if supplied
    pub latency_ms: Option<u64>,
}

impl ImpairmentUpdate {
    /// Parse an update from an arbitrary JSON body
    ///
    /// Never rejects input. Numbers and numeric strings are accepted,
    /// fractions truncate toward zero and negatives clamp to zero. A field
    /// that is absent or not numeric is left out of the update, and a body
    /// that is not an object is an empty update.
    pub fn from_json(body: &Value) -> Self {
        let field = |name: &str| body.get(name).and_then(coerce_non_negative);

        Self {
            loss_percent: field("loss_percent").map(|n| u32::try_from(n).unwrap_or(u32::MAX)),
            latency_ms: field("latency_ms"),
        }
    }

    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.loss_percent.is_none() && self.latency_ms.is_none()
    }
}

fn coerce_non_negative(value: &Value) -> Option<u64> {
    let n = match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Some(u);
            }
            match n.as_i64() {
                Some(i) => i as f64,
                None => n.as_f64()?,
            }
        }
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<u64>() {
                Ok(u) => return Some(u),
                Err(_) => s.parse::<f64>().ok()?,
            }
        }
        _ => return None,
    };

    if !n.is_finite() {
        return None;
    }
    // Float-to-int `as` saturates, so huge values land on u64::MAX.
    Some(n.trunc().max(0.0) as u64)
}
