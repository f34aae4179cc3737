//! `linewire` - an interactive newline-delimited TCP client.
//!
//! Lines read from stdin are sent to the server; messages from the server are
//! printed to stdout. Logs go to stderr.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms, clippy::all)]

mod cli;
mod session;

pub use cli::Cli;
pub use session::{SessionSummary, run_session};

use anyhow::Context;
use clap::Parser;
use linewire_tcp::Connection;

/// Parse arguments, connect, and run a session on stdin/stdout until EOF or
/// Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.init_tracing();

    let config = cli.connection_config()?;
    let connection = Connection::try_open(config)
        .await
        .context("failed to connect")?;

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    let summary = run_session(
        &connection,
        input,
        &mut output,
        cli.linger(),
        async {
            let _ = tokio::signal::ctrl_c().await;
        },
    )
    .await?;
    tracing::info!(
        "Session finished: {} lines sent, {} messages received",
        summary.sent,
        summary.received
    );

    connection.close().await;

    if cli.metrics {
        println!("{}", serde_json::to_string_pretty(&connection.metrics())?);
    }
    Ok(())
}
