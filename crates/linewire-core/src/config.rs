//! Connection configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConnectionError, ConnectionResult};

/// Environment prefix used by [`ConnectionConfig::from_file`].
const ENV_PREFIX: &str = "LINEWIRE";

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("Unsupported configuration file format. Use .toml, .yaml, .yml, or .json")]
    UnsupportedFormat,

    /// Configuration parsing error
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] config::ConfigError),
}

/// Everything needed to open a connection and tune its pumps.
///
/// Missing fields fall back to [`ConnectionConfig::default`], so a config file
/// only has to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Hostname or IP literal of the server.
    pub host: String,
    /// Port, as text. Parsed when connecting.
    pub port: String,
    /// Upper bound on the TCP connect, in milliseconds. Resolution is not
    /// included.
    pub connect_timeout_ms: u64,
    /// Maximum bytes taken off the socket per read.
    pub read_chunk_size: usize,
    /// Receive pump back-off after a failed read, and the polling step of
    /// `wait_next`, in milliseconds.
    pub poll_interval_ms: u64,
    /// Send pump sleep when the outgoing queue is empty, in milliseconds.
    pub send_idle_interval_ms: u64,
    /// How long `close` waits for the pumps before aborting them.
    pub shutdown_timeout_ms: u64,
    /// Set `TCP_NODELAY` on the socket.
    pub nodelay: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: "8080".to_string(),
            connect_timeout_ms: 5000,
            read_chunk_size: 1024,
            poll_interval_ms: 50,
            send_idle_interval_ms: 10,
            shutdown_timeout_ms: 5000,
            nodelay: true,
        }
    }
}

impl ConnectionConfig {
    /// Configuration for `host:port` with default tuning.
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a file (TOML, YAML, or JSON).
    ///
    /// The format is picked from the extension. Environment variables with the
    /// `LINEWIRE_` prefix override file settings, e.g. `LINEWIRE_PORT=9000`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with_prefix(path, ENV_PREFIX)
    }

    /// Load configuration from a file with a custom environment prefix.
    pub fn from_file_with_prefix(
        path: impl AsRef<Path>,
        env_prefix: &str,
    ) -> Result<Self, ConfigError> {
        use config::{Config, File, FileFormat};

        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => return Err(ConfigError::UnsupportedFormat),
        };

        let config = Config::builder()
            .add_source(File::new(
                path.to_str().ok_or(ConfigError::UnsupportedFormat)?,
                format,
            ))
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Check the configuration before connecting.
    pub fn validate(&self) -> ConnectionResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConnectionError::Configuration("host is empty".into()));
        }
        if self.read_chunk_size == 0 {
            return Err(ConnectionError::Configuration(
                "read_chunk_size must be greater than zero".into(),
            ));
        }
        self.port_number().map(|_| ())
    }

    /// The port parsed as a number.
    pub fn port_number(&self) -> ConnectionResult<u16> {
        self.port
            .trim()
            .parse()
            .map_err(|_| ConnectionError::InvalidPort(self.port.clone()))
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Receive poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Send idle interval as a [`Duration`].
    pub fn send_idle_interval(&self) -> Duration {
        Duration::from_millis(self.send_idle_interval_ms)
    }

    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.read_chunk_size, 1024);
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert!(config.nodelay);
    }

    #[test]
    fn test_port_parsing() {
        assert_eq!(ConnectionConfig::new("h", "2112").port_number(), Ok(2112));
        assert_eq!(ConnectionConfig::new("h", " 80 ").port_number(), Ok(80));
        assert_eq!(
            ConnectionConfig::new("h", "70000").port_number(),
            Err(ConnectionError::InvalidPort("70000".into()))
        );
        assert!(ConnectionConfig::new("h", "http").port_number().is_err());
    }

    #[test]
    fn test_validate() {
        assert_ok!(ConnectionConfig::new("localhost", "2112").validate());
        assert_err!(ConnectionConfig::new("", "2112").validate());

        let mut config = ConnectionConfig::new("localhost", "2112");
        config.read_chunk_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConnectionError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_toml_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "host = \"example.org\"\nport = \"2112\"\nread_chunk_size = 64").unwrap();

        let config =
            ConnectionConfig::from_file_with_prefix(file.path(), "LINEWIRE_TEST_TOML").unwrap();
        assert_eq!(config.host, "example.org");
        assert_eq!(config.port, "2112");
        assert_eq!(config.read_chunk_size, 64);
        assert_eq!(config.poll_interval_ms, 50);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"host": "10.0.0.1", "nodelay": false}}"#).unwrap();

        let config =
            ConnectionConfig::from_file_with_prefix(file.path(), "LINEWIRE_TEST_JSON").unwrap();
        assert_eq!(config.host, "10.0.0.1");
        assert!(!config.nodelay);
    }

    #[test]
    fn test_missing_file() {
        let result = ConnectionConfig::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = ConnectionConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat)));
    }
}
