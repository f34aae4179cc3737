//! Connection state types.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Lifecycle state of a connection.
///
/// ```text
/// Disconnected ──connect──▶ Connecting ──ok──▶ Bound ──close──▶ Closed
///                                │               │                ▲
///                                │          I/O error             │
///                                │               ▼                │
///                                └─fail─▶ Disconnected   Unbound ─┘
/// ```
///
/// `Unbound` is a substate of a running connection: the pumps keep going but
/// the last socket operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No socket; either never connected or the connect attempt failed.
    Disconnected,
    /// Resolution and connect are in flight.
    Connecting,
    /// Connected, and the last socket operation succeeded.
    Bound,
    /// Still running, but a socket read or write has failed.
    Unbound,
    /// Closed by the application. Terminal.
    Closed,
}

impl ConnectionState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Bound => 2,
            Self::Unbound => 3,
            Self::Closed => 4,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Bound,
            3 => Self::Unbound,
            4 => Self::Closed,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Bound => write!(f, "bound"),
            Self::Unbound => write!(f, "unbound"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A [`ConnectionState`] that can be read and updated from any thread.
#[derive(Debug)]
pub struct AtomicState(AtomicU8);

impl AtomicState {
    /// Create a cell holding `state`.
    pub const fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    /// Current state.
    pub fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Overwrite the state unconditionally.
    pub fn store(&self, state: ConnectionState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    /// Store `state` and return the previous one.
    pub fn swap(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.0.swap(state.as_u8(), Ordering::AcqRel))
    }

    /// Move `Bound` to `Unbound`. Any other state is left alone, so a pump
    /// racing with `close` can never resurrect a closed connection.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn mark_unbound(&self) -> bool {
        self.0
            .compare_exchange(
                ConnectionState::Bound.as_u8(),
                ConnectionState::Unbound.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// `true` while the state is [`ConnectionState::Bound`].
    pub fn is_bound(&self) -> bool {
        self.load() == ConnectionState::Bound
    }
}

impl Default for AtomicState {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Bound.to_string(), "bound");
        assert_eq!(ConnectionState::Unbound.to_string(), "unbound");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }

    #[test]
    fn test_atomic_state_roundtrips_every_variant() {
        let cell = AtomicState::default();
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Bound,
            ConnectionState::Unbound,
            ConnectionState::Closed,
        ] {
            cell.store(state);
            assert_eq!(cell.load(), state);
        }
    }

    #[test]
    fn test_mark_unbound_only_from_bound() {
        let cell = AtomicState::new(ConnectionState::Bound);
        assert!(cell.mark_unbound());
        assert_eq!(cell.load(), ConnectionState::Unbound);
        assert!(!cell.mark_unbound());

        let closed = AtomicState::new(ConnectionState::Closed);
        assert!(!closed.mark_unbound());
        assert_eq!(closed.load(), ConnectionState::Closed);
    }

    #[test]
    fn test_swap_returns_previous() {
        let cell = AtomicState::new(ConnectionState::Unbound);
        assert_eq!(cell.swap(ConnectionState::Closed), ConnectionState::Unbound);
        assert_eq!(cell.swap(ConnectionState::Closed), ConnectionState::Closed);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionState::Unbound).unwrap();
        assert_eq!(json, "\"unbound\"");
    }
}
