//! Unified error types for the GeoSignal controller.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! event loop's error handling uniform.  None of these ever halts the loop:
//! every domain error is terminal at the handler that produced it and is
//! only surfaced through the event sink.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A collaborator (actuator, gateway, positioning) reported a non-zero code.
    Transport(TransportError),
    /// The pending-request table was misused or is exhausted.
    Registry(RegistryError),
    /// The geofence engine delivered a transition kind we do not know.
    UnrecognizedEventKind(u8),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::UnrecognizedEventKind(raw) => write!(f, "unrecognized event kind {raw}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Non-zero status returned by an external collaborator.
///
/// Mirrors the `(code, message)` pair vendor SDKs hand back in their
/// completion callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub code: i32,
    pub message: String,
}

impl TransportError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {} ({})", self.code, self.message)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Every pending-request slot is occupied.
    Full,
    /// Completion for a handle that is unknown or already completed.
    Misuse(u32),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "pending request table full"),
            Self::Misuse(id) => write!(f, "completion for unknown handle #{id}"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
