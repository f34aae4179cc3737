//! Persistent line-delimited TCP connection.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use linewire_core::{
    AtomicMetrics, AtomicState, ConnectionConfig, ConnectionError, ConnectionMetrics,
    ConnectionResult, ConnectionState, SafeQueue,
};

use crate::pump::{receive_pump, send_pump};
use crate::resolver::resolve_host;

/// State shared between a [`Connection`] and its two pumps.
#[derive(Debug)]
pub(crate) struct Shared {
    /// `host:port` as configured, for log lines
    pub(crate) endpoint: String,
    /// Messages waiting for the send pump
    pub(crate) outgoing: SafeQueue<String>,
    /// Messages framed by the receive pump
    pub(crate) incoming: SafeQueue<String>,
    pub(crate) state: AtomicState,
    /// Cleared by `close`; pumps stop at their next check
    pub(crate) running: AtomicBool,
    pub(crate) metrics: AtomicMetrics,
}

impl Shared {
    fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            outgoing: SafeQueue::new(),
            incoming: SafeQueue::new(),
            state: AtomicState::default(),
            running: AtomicBool::new(false),
            metrics: AtomicMetrics::new(),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Record a socket failure seen by a pump.
    pub(crate) fn mark_unbound(&self, reason: &str) {
        if self.state.mark_unbound() {
            warn!("Connection to {} is no longer bound: {}", self.endpoint, reason);
        } else {
            debug!("Connection to {}: {}", self.endpoint, reason);
        }
    }
}

/// A persistent, bidirectional, newline-delimited TCP client connection.
///
/// Application code talks to the connection through two unbounded queues:
/// [`send`](Self::send) enqueues and [`receive_next`](Self::receive_next)
/// dequeues, and neither ever waits on the network. A send pump and a
/// receive pump move data between the queues and the socket in the
/// background until [`close`](Self::close).
///
/// Connecting is best-effort: [`connect`](Self::connect) always returns a
/// `Connection`, and the caller checks [`is_bound`](Self::is_bound). An
/// unbound connection is a silent sink. Use [`try_connect`](Self::try_connect)
/// to get the construction error instead.
///
/// The outgoing queue has no bound. A producer that outpaces the network
/// grows memory without limit; watch [`pending_outgoing`](Self::pending_outgoing)
/// if that matters.
pub struct Connection {
    config: ConnectionConfig,
    /// Resolved server address, once resolution succeeded
    remote_addr: Option<SocketAddr>,
    local_addr: Option<SocketAddr>,
    shared: Arc<Shared>,
    /// Send and receive pumps (tokio mutex - held across the join in `close`)
    task_handles: tokio::sync::Mutex<JoinSet<()>>,
    shutdown_tx: broadcast::Sender<()>,
    last_error: Option<ConnectionError>,
}

// Manual Debug implementation since broadcast::Sender doesn't implement Debug
impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.shared.endpoint)
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.local_addr)
            .field("state", &self.shared.state.load())
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl Connection {
    /// Connect to `hostname:port`, best-effort.
    ///
    /// Resolves the host, connects within the default timeout, and starts
    /// both pumps. On failure the returned connection is unbound and
    /// [`last_error`](Self::last_error) says why.
    pub async fn connect(hostname: &str, port: &str) -> Self {
        Self::open(ConnectionConfig::new(hostname, port)).await
    }

    /// Connect to `hostname:port`, returning the construction error on failure.
    pub async fn try_connect(hostname: &str, port: &str) -> ConnectionResult<Self> {
        Self::try_open(ConnectionConfig::new(hostname, port)).await
    }

    /// Best-effort connect using `config`.
    pub async fn open(config: ConnectionConfig) -> Self {
        let mut connection = Self::unconnected(config);
        if let Err(e) = connection.establish().await {
            error!("Unable to connect to {}: {}", connection.shared.endpoint, e);
            connection.last_error = Some(e);
        }
        connection
    }

    /// Connect using `config`, returning the construction error on failure.
    pub async fn try_open(config: ConnectionConfig) -> ConnectionResult<Self> {
        let mut connection = Self::unconnected(config);
        connection.establish().await?;
        Ok(connection)
    }

    fn unconnected(config: ConnectionConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let endpoint = format!("{}:{}", config.host, config.port);
        Self {
            config,
            remote_addr: None,
            local_addr: None,
            shared: Arc::new(Shared::new(endpoint)),
            task_handles: tokio::sync::Mutex::new(JoinSet::new()),
            shutdown_tx,
            last_error: None,
        }
    }

    /// Resolve, connect, and start the pumps.
    async fn establish(&mut self) -> ConnectionResult<()> {
        self.shared.state.store(ConnectionState::Connecting);
        self.shared.metrics.connections.fetch_add(1, Ordering::Relaxed);

        let stream = match self.open_socket().await {
            Ok(stream) => stream,
            Err(e) => {
                self.shared.state.store(ConnectionState::Disconnected);
                self.shared
                    .metrics
                    .failed_connections
                    .fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        self.local_addr = stream.local_addr().ok();
        let (reader, writer) = stream.into_split();

        self.shared.running.store(true, Ordering::Release);
        self.shared.state.store(ConnectionState::Bound);

        let tasks = self.task_handles.get_mut();
        tasks.spawn(send_pump(
            writer,
            Arc::clone(&self.shared),
            self.config.send_idle_interval(),
            self.shutdown_tx.subscribe(),
        ));
        tasks.spawn(receive_pump(
            reader,
            Arc::clone(&self.shared),
            self.config.read_chunk_size,
            self.config.poll_interval(),
            self.shutdown_tx.subscribe(),
        ));

        info!(
            "Connected to {} ({})",
            self.shared.endpoint,
            self.remote_addr.map_or_else(String::new, |a| a.to_string())
        );
        Ok(())
    }

    async fn open_socket(&mut self) -> ConnectionResult<TcpStream> {
        self.config.validate()?;
        let port = self.config.port_number()?;
        let ip = resolve_host(&self.config.host).await?;
        let addr = SocketAddr::new(ip, port);
        self.remote_addr = Some(addr);

        let timeout = self.config.connect_timeout();
        debug!("Connecting to {} with timeout {:?}", addr, timeout);

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ConnectionError::Connect {
                    addr,
                    reason: e.to_string(),
                });
            }
            Err(_) => return Err(ConnectionError::ConnectTimeout { addr, timeout }),
        };

        if self.config.nodelay {
            stream.set_nodelay(true)?;
        }
        Ok(stream)
    }

    /// `true` while the connection believes its socket is healthy.
    ///
    /// Reflects the last socket operation, not a live probe.
    pub fn is_bound(&self) -> bool {
        self.shared.state.is_bound()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.load()
    }

    /// Queue `message` for sending. Never blocks.
    ///
    /// The send pump appends the `\n` delimiter. A message that itself
    /// contains `\n` is sent as-is and will be received as several messages.
    pub fn send(&self, message: impl Into<String>) {
        let message = message.into();
        if self.state() == ConnectionState::Closed {
            debug!("Dropping message for closed connection {}", self.shared.endpoint);
            return;
        }
        if message.contains('\n') {
            warn!(
                "Message to {} contains an embedded newline and will be split by the receiver",
                self.shared.endpoint
            );
        }
        self.shared.outgoing.push(message);
    }

    /// Take the next received message, if one is waiting. Never blocks.
    pub fn receive_next(&self) -> Option<String> {
        self.shared.incoming.try_pop()
    }

    /// `true` if at least one complete message is waiting.
    pub fn has_next(&self) -> bool {
        !self.shared.incoming.is_empty()
    }

    /// Poll for the next message until one arrives or `timeout` elapses.
    ///
    /// Polls every `poll_interval_ms`; the connection itself is unaffected
    /// if the deadline passes. A `timeout` too large to represent waits
    /// forever.
    pub async fn wait_next(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(message) = self.receive_next() {
                return Some(message);
            }
            let mut step = self.config.poll_interval();
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return None;
                }
                step = step.min(deadline - now);
            }
            tokio::time::sleep(step).await;
        }
    }

    /// Messages queued but not yet written to the socket.
    pub fn pending_outgoing(&self) -> usize {
        self.shared.outgoing.len()
    }

    /// Snapshot of the traffic counters.
    pub fn metrics(&self) -> ConnectionMetrics {
        self.shared.metrics.snapshot()
    }

    /// Why construction failed, for a connection that never bound.
    pub fn last_error(&self) -> Option<&ConnectionError> {
        self.last_error.as_ref()
    }

    /// The resolved server address, if resolution succeeded.
    pub fn remote_ip(&self) -> Option<IpAddr> {
        self.remote_addr.map(|addr| addr.ip())
    }

    /// The port as configured.
    pub fn port(&self) -> &str {
        &self.config.port
    }

    /// Local socket address, if connected.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// `tcp://ip:port` of the resolved server.
    pub fn endpoint(&self) -> Option<String> {
        self.remote_addr.map(|addr| format!("tcp://{addr}"))
    }

    /// The configuration this connection was opened with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Stop both pumps, wait for them, and drop any queued messages.
    ///
    /// Safe to call from any task and more than once; later calls wait for
    /// the first to finish joining. Pumps that outlive `shutdown_timeout_ms`
    /// are aborted.
    /// The socket halves belong to the pumps, so the socket is released
    /// exactly when they finish. Do not use the connection afterwards.
    pub async fn close(&self) {
        if self.shared.state.swap(ConnectionState::Closed) == ConnectionState::Closed {
            // Another caller may still be joining the pumps
            let _tasks = self.task_handles.lock().await;
            debug!("Connection to {} already closed", self.shared.endpoint);
            return;
        }

        info!("Closing connection to {}", self.shared.endpoint);
        self.shared.running.store(false, Ordering::Release);
        let _ = self.shutdown_tx.send(());

        let mut tasks = self.task_handles.lock().await;
        let task_count = tasks.len();

        if task_count > 0 {
            debug!("Waiting for {} pumps to stop", task_count);

            let shutdown_timeout = self.config.shutdown_timeout();
            let start = std::time::Instant::now();

            while let Some(result) = tokio::time::timeout(
                shutdown_timeout.saturating_sub(start.elapsed()),
                tasks.join_next(),
            )
            .await
            .ok()
            .flatten()
            {
                if let Err(e) = result
                    && e.is_panic()
                {
                    warn!("Pump panicked during shutdown: {:?}", e);
                }
            }

            if !tasks.is_empty() {
                warn!("Aborting {} pumps after shutdown timeout", tasks.len());
                tasks.shutdown().await;
            }
        }

        let dropped_out = self.shared.outgoing.clear();
        let dropped_in = self.shared.incoming.clear();
        if dropped_out + dropped_in > 0 {
            debug!(
                "Dropped {} unsent and {} unread messages for {}",
                dropped_out, dropped_in, self.shared.endpoint
            );
        }
        info!("Connection to {} closed", self.shared.endpoint);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.shared.state.load() != ConnectionState::Closed {
            debug!("Connection to {} dropped without close", self.shared.endpoint);
            self.shared.running.store(false, Ordering::Release);
            let _ = self.shutdown_tx.send(());
        }
    }
}
