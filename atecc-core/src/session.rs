//! Device power state tracking
//!
//! The chip drops to sleep or idle between commands and has to be woken
//! before it accepts a frame. The session remembers whether the chip is
//! believed to be awake so a wake pulse is only sent when needed.

use std::fmt;

/// Power state as last seen by the host
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing sent yet
    #[default]
    Unknown,

    /// Chip was put in idle mode after a command
    Idle,

    /// Chip is awake and accepted a frame
    Active,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Idle => "idle",
            Self::Active => "active",
        };
        f.write_str(name)
    }
}

/// Session state machine
///
/// Lives only in memory; owned by whoever drives the transport.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    /// Create a new session in the unknown state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if the chip is believed to be awake
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Chip woke up or accepted a frame
    pub fn activate(&mut self) {
        self.state = SessionState::Active;
    }

    /// Chip was sent back to idle
    pub fn idle(&mut self) {
        self.state = SessionState::Idle;
    }
}
