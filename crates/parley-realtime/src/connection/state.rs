//! Per-connection lifecycle states.

use std::fmt;

/// Lifecycle of a single connection. Transitions only move forward and
/// `Disconnected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Handshake received, credential not yet verified.
    Unauthenticated = 0,
    /// Credential verified, not yet reachable.
    Authenticated = 1,
    /// Present in the registry and the directory.
    Registered = 2,
    /// Announced and processing events.
    Active = 3,
    /// Torn down.
    Disconnected = 4,
}

impl ConnectionState {
    /// Decode the stored discriminant.
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unauthenticated,
            1 => Self::Authenticated,
            2 => Self::Registered,
            3 => Self::Active,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Registered => write!(f, "registered"),
            Self::Active => write!(f, "active"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}
