//! Fluent construction of connections.

use linewire_core::{ConnectionConfig, ConnectionResult};

use crate::connection::Connection;

/// Connection builder
#[derive(Debug, Clone, Default)]
pub struct ConnectionBuilder {
    config: ConnectionConfig,
}

impl ConnectionBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one loaded from a file.
    #[must_use]
    pub fn from_config(config: ConnectionConfig) -> Self {
        Self { config }
    }

    /// Set the server hostname or IP literal
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    #[must_use]
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.port = port.into();
        self
    }

    /// Set connection timeout
    #[must_use]
    pub fn connect_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.connect_timeout_ms = timeout;
        self
    }

    /// Set the maximum bytes taken per socket read
    #[must_use]
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Set the receive back-off / `wait_next` polling interval
    #[must_use]
    pub fn poll_interval_ms(mut self, interval: u64) -> Self {
        self.config.poll_interval_ms = interval;
        self
    }

    /// Set the send pump idle sleep
    #[must_use]
    pub fn send_idle_interval_ms(mut self, interval: u64) -> Self {
        self.config.send_idle_interval_ms = interval;
        self
    }

    /// Set how long `close` waits for the pumps
    #[must_use]
    pub fn shutdown_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.shutdown_timeout_ms = timeout;
        self
    }

    /// Enable or disable `TCP_NODELAY`
    #[must_use]
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.config.nodelay = enabled;
        self
    }

    /// Finish without connecting.
    #[must_use]
    pub fn build(self) -> ConnectionConfig {
        self.config
    }

    /// Best-effort connect; see [`Connection::open`].
    pub async fn connect(self) -> Connection {
        Connection::open(self.config).await
    }

    /// Connect or fail; see [`Connection::try_open`].
    pub async fn try_connect(self) -> ConnectionResult<Connection> {
        Connection::try_open(self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let config = ConnectionBuilder::new()
            .host("lab1-12.example.edu")
            .port("2112")
            .connect_timeout_ms(250)
            .read_chunk_size(16)
            .poll_interval_ms(5)
            .send_idle_interval_ms(1)
            .shutdown_timeout_ms(100)
            .nodelay(false)
            .build();

        assert_eq!(config.host, "lab1-12.example.edu");
        assert_eq!(config.port, "2112");
        assert_eq!(config.connect_timeout_ms, 250);
        assert_eq!(config.read_chunk_size, 16);
        assert_eq!(config.poll_interval_ms, 5);
        assert_eq!(config.send_idle_interval_ms, 1);
        assert_eq!(config.shutdown_timeout_ms, 100);
        assert!(!config.nodelay);
    }

    #[test]
    fn test_builder_from_config_keeps_values() {
        let base = ConnectionConfig::new("example.org", "7");
        let config = ConnectionBuilder::from_config(base.clone()).build();
        assert_eq!(config, base);
    }
}
