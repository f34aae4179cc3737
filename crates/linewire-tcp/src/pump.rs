//! Background send and receive loops.
//!
//! Each connection runs exactly one of each. The send pump owns the write
//! half of the socket and the receive pump owns the read half, so neither
//! half needs a lock. Socket failures never escape a pump: they are counted,
//! logged, and reflected by moving the connection from `Bound` to `Unbound`.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::broadcast;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

use crate::codec::LineCodec;
use crate::connection::Shared;

/// Drain the outgoing queue onto the socket until shutdown.
///
/// A failed write drops that message, marks the connection unbound and
/// carries on with the next one.
pub(crate) async fn send_pump(
    mut writer: OwnedWriteHalf,
    shared: Arc<Shared>,
    idle_interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    debug!("Send pump started for {}", shared.endpoint);

    let mut codec = LineCodec::new();
    let mut frame = BytesMut::new();

    while shared.is_running() {
        let Some(message) = shared.outgoing.try_pop() else {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                () = tokio::time::sleep(idle_interval) => {}
            }
            continue;
        };

        frame.clear();
        if let Err(e) = codec.encode(message.as_str(), &mut frame) {
            warn!("Failed to frame outgoing message: {}", e);
            continue;
        }

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            result = writer.write_all(&frame) => match result {
                Ok(()) => {
                    trace!("Sent {} bytes to {}", frame.len(), shared.endpoint);
                    shared.metrics.record_sent(frame.len());
                }
                Err(e) => {
                    shared.metrics.send_errors.fetch_add(1, Ordering::Relaxed);
                    shared.mark_unbound(&format!("write failed: {e}"));
                }
            }
        }
    }

    debug!("Send pump stopped for {}", shared.endpoint);
}

/// Read the socket, frame complete lines, and queue them as incoming
/// messages until shutdown.
///
/// At most `chunk_size` bytes are taken per read and only the bytes actually
/// read are fed to the framer. A partial line stays buffered across reads.
pub(crate) async fn receive_pump(
    mut reader: OwnedReadHalf,
    shared: Arc<Shared>,
    chunk_size: usize,
    poll_interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    debug!("Receive pump started for {}", shared.endpoint);

    let mut codec = LineCodec::new();
    let mut pending = BytesMut::with_capacity(chunk_size);
    let mut chunk = vec![0u8; chunk_size];

    while shared.is_running() {
        let read = tokio::select! {
            _ = shutdown_rx.recv() => break,
            read = reader.read(&mut chunk) => read,
        };

        match read {
            Ok(0) => {
                shared.mark_unbound("peer closed the connection");
                if !pending.is_empty() {
                    debug!(
                        "Discarding {} bytes of unterminated message from {}",
                        pending.len(),
                        shared.endpoint
                    );
                }
                // Nothing more can arrive on this socket
                let _ = shutdown_rx.recv().await;
                break;
            }
            Ok(n) => {
                pending.extend_from_slice(&chunk[..n]);
                let completed = drain_frames(&mut codec, &mut pending, &shared);
                trace!(
                    "Read {} bytes from {}, {} complete messages",
                    n, shared.endpoint, completed
                );
                shared.metrics.record_received(n, completed);
            }
            Err(e) => {
                shared.metrics.receive_errors.fetch_add(1, Ordering::Relaxed);
                shared.mark_unbound(&format!("read failed: {e}"));
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    () = tokio::time::sleep(poll_interval) => {}
                }
            }
        }
    }

    debug!("Receive pump stopped for {}", shared.endpoint);
}

/// Push every complete line in `pending` onto the incoming queue.
fn drain_frames(codec: &mut LineCodec, pending: &mut BytesMut, shared: &Shared) -> usize {
    let mut completed = 0;
    loop {
        match codec.decode(pending) {
            Ok(Some(message)) => {
                shared.incoming.push(message);
                completed += 1;
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to frame incoming bytes: {}", e);
                break;
            }
        }
    }
    completed
}
