//! Connection error types.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// A specialized `Result` type for connection setup.
pub type ConnectionResult<T> = std::result::Result<T, ConnectionError>;

/// Errors that can occur while establishing a connection.
///
/// Only construction reports these. Once a connection is running, socket
/// failures are absorbed by the pumps and surface solely through
/// `is_bound()` and the error counters in the metrics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionError {
    /// The hostname could not be resolved to any address.
    #[error("Failed to resolve host '{host}': {reason}")]
    Resolution {
        /// The hostname that was looked up
        host: String,
        /// Why the lookup failed
        reason: String,
    },

    /// The port was not a number in `0..=65535`.
    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    /// The TCP connect attempt was refused or otherwise failed.
    #[error("Failed to connect to {addr}: {reason}")]
    Connect {
        /// The address the connect was attempted against
        addr: SocketAddr,
        /// The OS-level failure
        reason: String,
    },

    /// The TCP connect attempt did not finish in time.
    #[error(
        "Connection to {addr} timed out after {timeout:?}. \
         If the server is slow to accept, raise `connect_timeout_ms`"
    )]
    ConnectTimeout {
        /// The address the connect was attempted against
        addr: SocketAddr,
        /// The timeout that was exceeded
        timeout: Duration,
    },

    /// The connection was configured with invalid parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An underlying I/O error occurred.
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl ConnectionError {
    /// Returns `true` for failures of the connect step itself, as opposed to
    /// resolution or configuration problems.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::ConnectTimeout { .. })
    }
}
