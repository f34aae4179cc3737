//! Interactive session: input lines out, received messages in.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use linewire_tcp::Connection;

/// Counters for a finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Lines handed to the connection.
    pub sent: u64,
    /// Messages written to the output.
    pub received: u64,
}

/// Send every line of `input` and write received messages to `output`, one
/// per line.
///
/// Returns when `interrupt` completes, or `linger` after `input` reaches EOF.
/// The connection is left open; closing it is up to the caller.
pub async fn run_session<R, W, F>(
    connection: &Connection,
    input: R,
    output: &mut W,
    linger: Duration,
    interrupt: F,
) -> anyhow::Result<SessionSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    let tick = connection.config().poll_interval();
    let peer = format!("{}:{}", connection.config().host, connection.port());
    let mut lines = input.lines();
    let mut summary = SessionSummary::default();
    let mut reported_unbound = false;
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            () = &mut interrupt => {
                info!("Interrupted, closing {}", peer);
                summary.received += write_received(connection, output).await?;
                return Ok(summary);
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    connection.send(line);
                    summary.sent += 1;
                }
                None => {
                    debug!("Input closed after {} lines", summary.sent);
                    break;
                }
            },
            () = tokio::time::sleep(tick) => {}
        }

        summary.received += write_received(connection, output).await?;

        if !reported_unbound && !connection.is_bound() {
            warn!("Connection to {} is no longer bound", peer);
            reported_unbound = true;
        }
    }

    // An unrepresentable linger lasts until `interrupt`
    let deadline = Instant::now().checked_add(linger);
    loop {
        summary.received += write_received(connection, output).await?;
        let mut step = tick;
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            step = step.min(deadline - now);
        }
        tokio::select! {
            () = &mut interrupt => break,
            () = tokio::time::sleep(step) => {}
        }
    }
    summary.received += write_received(connection, output).await?;

    Ok(summary)
}

async fn write_received<W>(connection: &Connection, output: &mut W) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(message) = connection.receive_next() {
        output.write_all(message.as_bytes()).await?;
        output.write_all(b"\n").await?;
        written += 1;
    }
    if written > 0 {
        output.flush().await?;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, BufReader};
    use tokio::net::TcpListener;

    async fn echo_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if stream.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_session_echoes_input_lines() {
        let addr = echo_server().await;
        let connection = Connection::try_connect("127.0.0.1", &addr.port().to_string())
            .await
            .unwrap();

        let mut output = Vec::new();
        let summary = run_session(
            &connection,
            &b"one\ntwo\n"[..],
            &mut output,
            Duration::from_secs(1),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(summary, SessionSummary { sent: 2, received: 2 });
        assert_eq!(String::from_utf8(output).unwrap(), "one\ntwo\n");
        connection.close().await;
    }

    #[tokio::test]
    async fn test_interrupt_ends_session_with_open_input() {
        let addr = echo_server().await;
        let connection = Connection::try_connect("127.0.0.1", &addr.port().to_string())
            .await
            .unwrap();

        // The writer half stays alive, so the input never reaches EOF.
        let (reader, _writer) = tokio::io::duplex(64);
        let mut output = Vec::new();
        let started = Instant::now();
        let summary = run_session(
            &connection,
            BufReader::new(reader),
            &mut output,
            Duration::from_secs(30),
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await
        .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(summary.sent, 0);
        assert!(output.is_empty());
        connection.close().await;
    }

    #[tokio::test]
    async fn test_unbounded_linger_ends_on_interrupt() {
        let addr = echo_server().await;
        let connection = Connection::try_connect("127.0.0.1", &addr.port().to_string())
            .await
            .unwrap();

        let mut output = Vec::new();
        let summary = tokio::time::timeout(
            Duration::from_secs(5),
            run_session(
                &connection,
                &b""[..],
                &mut output,
                Duration::MAX,
                tokio::time::sleep(Duration::from_millis(150)),
            ),
        )
        .await
        .expect("linger ignored the interrupt")
        .unwrap();

        assert_eq!(summary, SessionSummary::default());
        connection.close().await;
    }
}
