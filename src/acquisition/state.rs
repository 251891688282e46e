// src/acquisition/state.rs
//! Session lifecycle states

use std::fmt;

/// Lifecycle state of an [`AcquisitionSession`](super::AcquisitionSession)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, subsystem not yet opened
    Uninitialized,
    /// Subsystem open; channels may be configured and read
    Configured,
    /// At least one trigger armed
    Armed,
    /// Init or configuration failed; only re-init or close are useful
    Error,
    /// Torn down; terminal
    Closed,
}

impl SessionState {
    /// Live sample buffer can be read
    pub fn can_read(self) -> bool {
        matches!(self, SessionState::Configured | SessionState::Armed)
    }

    /// Triggers may be armed
    pub fn can_arm(self) -> bool {
        matches!(self, SessionState::Configured | SessionState::Armed)
    }

    /// `init` may be (re-)attempted
    pub fn can_init(self) -> bool {
        matches!(self, SessionState::Uninitialized | SessionState::Error)
    }

    /// Session has been torn down
    pub fn is_closed(self) -> bool {
        self == SessionState::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "UNINITIALIZED",
            SessionState::Configured => "CONFIGURED",
            SessionState::Armed => "ARMED",
            SessionState::Error => "ERROR",
            SessionState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}
