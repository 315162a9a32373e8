//! Session state machine
//!
//! A relay connection is `Connected` from registration until teardown,
//! then `Closed` for good.

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    /// Registered and relaying
    Connected,
    /// Deregistered (terminal)
    Closed,
}

/// Tracks the phase of one connection
#[derive(Debug)]
pub struct SessionState {
    phase: SessionPhase,
}

impl SessionState {
    /// Create a connected session
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Connected,
        }
    }

    /// Transition to `Closed`
    ///
    /// Returns `true` only for the call that performed the transition, so
    /// teardown work runs exactly once.
    pub fn close(&mut self) -> bool {
        match self.phase {
            SessionPhase::Connected => {
                self.phase = SessionPhase::Closed;
                true
            }
            SessionPhase::Closed => false,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
