//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use linewire_tcp::ConnectionConfig;

/// Talk to a newline-delimited TCP server.
#[derive(Parser, Debug)]
#[command(name = "linewire", author, version, about)]
pub struct Cli {
    /// Server hostname or IP address (overrides the config file)
    pub host: Option<String>,

    /// Server port (overrides the config file)
    pub port: Option<String>,

    /// Configuration file (.toml, .yaml, .yml or .json)
    #[arg(short, long, env = "LINEWIRE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Connect timeout in milliseconds
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    /// How long to keep printing replies after stdin closes, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub linger_ms: u64,

    /// Print the connection metrics as JSON on exit
    #[arg(long)]
    pub metrics: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Initialize the tracing subscriber. `RUST_LOG` wins over `-v`/`-q`.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level().as_str()));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    fn log_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            }
        }
    }

    /// Build the connection config: file (if any), then arguments on top.
    pub fn connection_config(&self) -> anyhow::Result<ConnectionConfig> {
        let mut config = match &self.config {
            Some(path) => ConnectionConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => {
                if self.host.is_none() || self.port.is_none() {
                    bail!("HOST and PORT are required when no --config file is given");
                }
                ConnectionConfig::default()
            }
        };

        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = &self.port {
            config.port.clone_from(port);
        }
        if let Some(timeout) = self.connect_timeout_ms {
            config.connect_timeout_ms = timeout;
        }
        Ok(config)
    }

    /// Linger after stdin EOF.
    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["linewire", "lab1-12.example.edu", "2112"]).unwrap();
        assert_eq!(cli.host.as_deref(), Some("lab1-12.example.edu"));
        assert_eq!(cli.port.as_deref(), Some("2112"));
        assert!(!cli.metrics);
        assert_eq!(cli.linger(), Duration::from_millis(500));
    }

    #[test]
    fn test_verbosity_levels() {
        let cli = Cli::try_parse_from(["linewire", "-vv", "h", "1"]).unwrap();
        assert_eq!(cli.log_level(), Level::DEBUG);

        let cli = Cli::try_parse_from(["linewire", "-vvvv", "h", "1"]).unwrap();
        assert_eq!(cli.log_level(), Level::TRACE);

        let cli = Cli::try_parse_from(["linewire", "-q", "h", "1"]).unwrap();
        assert_eq!(cli.log_level(), Level::ERROR);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["linewire", "-v", "--quiet", "h", "1"]).is_err());
    }

    #[test]
    fn test_arguments_become_config() {
        let cli = Cli::try_parse_from([
            "linewire",
            "example.org",
            "7",
            "--connect-timeout-ms",
            "250",
        ])
        .unwrap();
        let config = cli.connection_config().unwrap();
        assert_eq!(config.host, "example.org");
        assert_eq!(config.port, "7");
        assert_eq!(config.connect_timeout_ms, 250);
        assert_eq!(config.read_chunk_size, 1024);
    }

    #[test]
    fn test_host_and_port_required_without_config() {
        let cli = Cli::try_parse_from(["linewire", "example.org"]).unwrap();
        assert!(cli.connection_config().is_err());
    }
}
