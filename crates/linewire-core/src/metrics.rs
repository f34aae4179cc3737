//! Connection metrics types.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A serializable snapshot of a connection's traffic counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionMetrics {
    /// Total bytes written to the socket, delimiters included.
    pub bytes_sent: u64,

    /// Total bytes read from the socket.
    pub bytes_received: u64,

    /// Messages fully written to the socket.
    pub messages_sent: u64,

    /// Complete messages framed off the wire.
    pub messages_received: u64,

    /// Connect attempts.
    pub connections: u64,

    /// Connect attempts that failed (resolution, connect or timeout).
    pub failed_connections: u64,

    /// Socket writes that failed in the send pump.
    pub send_errors: u64,

    /// Socket reads that failed in the receive pump.
    pub receive_errors: u64,
}

/// Lock-free counters updated by the pumps.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    /// Total bytes sent (atomic counter).
    pub bytes_sent: AtomicU64,

    /// Total bytes received (atomic counter).
    pub bytes_received: AtomicU64,

    /// Total messages sent (atomic counter).
    pub messages_sent: AtomicU64,

    /// Total messages received (atomic counter).
    pub messages_received: AtomicU64,

    /// Connect attempts (atomic counter).
    pub connections: AtomicU64,

    /// Failed connect attempts (atomic counter).
    pub failed_connections: AtomicU64,

    /// Failed socket writes (atomic counter).
    pub send_errors: AtomicU64,

    /// Failed socket reads (atomic counter).
    pub receive_errors: AtomicU64,
}

impl AtomicMetrics {
    /// Creates a new `AtomicMetrics` instance with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one message of `bytes` written to the socket.
    pub fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a chunk of `bytes` read from the socket and the number of
    /// messages it completed.
    pub fn record_received(&self, bytes: usize, messages: usize) {
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_received
            .fetch_add(messages as u64, Ordering::Relaxed);
    }

    /// Creates a serializable snapshot from the current counter values.
    pub fn snapshot(&self) -> ConnectionMetrics {
        ConnectionMetrics {
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            failed_connections: self.failed_connections.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.bytes_received.store(0, Ordering::Relaxed);
        self.messages_sent.store(0, Ordering::Relaxed);
        self.messages_received.store(0, Ordering::Relaxed);
        self.connections.store(0, Ordering::Relaxed);
        self.failed_connections.store(0, Ordering::Relaxed);
        self.send_errors.store(0, Ordering::Relaxed);
        self.receive_errors.store(0, Ordering::Relaxed);
    }
}
