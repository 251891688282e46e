// src/error.rs
//! Error taxonomy for drop sensing sessions
//!
//! Every fallible session operation has its own error type so callers can
//! match on exactly what went wrong at that lifecycle step. Each error keeps
//! the analog subsystem's original diagnostic text (when the subsystem
//! produced one) next to a structured kind. [`SenseError`] unifies them for
//! code that drives the whole lifecycle and only cares about the category.

use crate::config::loader::LoadError;
use std::fmt;
use thiserror::Error;

/// Result alias for operations that may fail at any lifecycle step
pub type SenseResult<T> = Result<T, SenseError>;

/// Renders an optional diagnostic as `": text"` for error messages
struct Diag<'a>(&'a Option<String>);

impl fmt::Display for Diag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(text) => write!(f, ": {}", text),
            None => Ok(()),
        }
    }
}

/// The analog subsystem could not be opened or bound
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    /// Subsystem refused to open (permissions, device absent, already held)
    #[error("analog subsystem failed to open{}", Diag(.diagnostic))]
    OpenFailed {
        /// Subsystem message
        diagnostic: Option<String>,
    },

    /// `init` called on a session that is already bound or closed
    #[error("session cannot be initialized from state {state}")]
    InvalidState {
        /// State the session was in
        state: crate::acquisition::SessionState,
    },
}

/// Kind of channel configuration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// Duplicate ids/steps, out-of-range values or an empty channel list
    InvalidChannels,
    /// Session is not in a state that accepts configuration
    InvalidState,
    /// The subsystem rejected a step assignment
    StepRejected,
    /// The subsystem rejected the mask, sample rate or ran out of resources
    Rejected,
}

/// Channel configuration failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("channel configuration failed ({kind:?}){}", Diag(.diagnostic))]
pub struct ConfigError {
    /// What went wrong
    pub kind: ConfigErrorKind,
    /// Subsystem or validation message
    pub diagnostic: Option<String>,
}

impl ConfigError {
    pub(crate) fn new(kind: ConfigErrorKind, diagnostic: impl Into<String>) -> Self {
        Self { kind, diagnostic: Some(diagnostic.into()) }
    }
}

/// Kind of trigger arming failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmErrorKind {
    /// Channel id was never configured on this session
    UnknownChannel,
    /// Session is not Configured or Armed
    InvalidState,
    /// All hardware trigger slots are already in use
    SlotsExhausted,
    /// The subsystem returned a zero handle
    Rejected,
}

/// Trigger arming failed; the session stays usable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("trigger arming failed ({kind:?}){}", Diag(.diagnostic))]
pub struct ArmError {
    /// What went wrong
    pub kind: ArmErrorKind,
    /// Subsystem or validation message
    pub diagnostic: Option<String>,
}

impl ArmError {
    pub(crate) fn new(kind: ArmErrorKind, diagnostic: impl Into<String>) -> Self {
        Self { kind, diagnostic: Some(diagnostic.into()) }
    }
}

/// Blocking wait failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// More handles than the subsystem can watch in one call
    #[error("{count} triggers requested, at most {limit} can be waited on")]
    TooManyTriggers {
        /// Handles passed in
        count: usize,
        /// Handles one wait can watch
        limit: usize,
    },

    /// No handle supplied
    #[error("wait called without any trigger")]
    NoTriggers,

    /// Handle was not armed by this session
    #[error("trigger handle {handle:#x} was not armed by this session")]
    UnknownTrigger {
        /// Raw handle value
        handle: u32,
    },

    /// Session holds no armed trigger to wait on
    #[error("session cannot wait from state {state}")]
    InvalidState {
        /// State the session was in
        state: crate::acquisition::SessionState,
    },

    /// Timeout elapsed before any trigger fired
    #[error("no trigger fired within the timeout{}", Diag(.diagnostic))]
    TimedOut {
        /// Subsystem message, if any
        diagnostic: Option<String>,
    },

    /// Subsystem-level failure while blocking
    #[error("analog subsystem failed while waiting{}", Diag(.diagnostic))]
    Subsystem {
        /// Subsystem message
        diagnostic: Option<String>,
    },
}

/// Polling read failed before reaching the subsystem
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// Channel was never configured on this session
    #[error("channel {channel} is not configured on this session")]
    UnknownChannel {
        /// Requested channel id
        channel: u8,
    },

    /// Session has no live sample buffer
    #[error("session cannot be read from state {state}")]
    NotReady {
        /// State the session was in
        state: crate::acquisition::SessionState,
    },
}

/// Coarse error category for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Opening the subsystem
    Init,
    /// Channel configuration
    Config,
    /// Trigger arming
    Arm,
    /// Blocking wait
    Wait,
    /// Polling read
    Read,
    /// Loading or validating settings
    Settings,
}

/// Any failure of the drop sensing stack
#[derive(Debug, Error)]
pub enum SenseError {
    /// Opening the subsystem failed
    #[error(transparent)]
    Init(#[from] InitError),

    /// Channel configuration failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Trigger arming failed
    #[error(transparent)]
    Arm(#[from] ArmError),

    /// Blocking wait failed
    #[error(transparent)]
    Wait(#[from] WaitError),

    /// Polling read failed
    #[error(transparent)]
    Read(#[from] ReadError),

    /// Settings could not be loaded
    #[error("settings error: {0}")]
    Settings(#[from] LoadError),
}

impl SenseError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SenseError::Init(_) => ErrorKind::Init,
            SenseError::Config(_) => ErrorKind::Config,
            SenseError::Arm(_) => ErrorKind::Arm,
            SenseError::Wait(_) => ErrorKind::Wait,
            SenseError::Read(_) => ErrorKind::Read,
            SenseError::Settings(_) => ErrorKind::Settings,
        }
    }

    /// Subsystem diagnostic carried by the error, if any
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            SenseError::Init(InitError::OpenFailed { diagnostic }) => diagnostic.as_deref(),
            SenseError::Config(err) => err.diagnostic.as_deref(),
            SenseError::Arm(err) => err.diagnostic.as_deref(),
            SenseError::Wait(WaitError::TimedOut { diagnostic })
            | SenseError::Wait(WaitError::Subsystem { diagnostic }) => diagnostic.as_deref(),
            _ => None,
        }
    }

    /// Whether the session remains usable after this error.
    ///
    /// Init and configuration failures leave the session in `Error`; arm
    /// and wait failures do not change the session state.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SenseError::Arm(_) | SenseError::Wait(_) | SenseError::Read(_))
    }

    /// Whether a caller should stop before any wait or poll
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Init | ErrorKind::Config | ErrorKind::Settings)
    }
}
