//! Hostname resolution.

use std::net::IpAddr;

use linewire_core::{ConnectionError, ConnectionResult};
use tracing::debug;

/// Resolve `hostname` to its first address.
///
/// Uses the system resolver through [`tokio::net::lookup_host`]. IP literals
/// come back unchanged. One attempt, no caching.
pub async fn resolve_host(hostname: &str) -> ConnectionResult<IpAddr> {
    let resolution_error = |reason: String| ConnectionError::Resolution {
        host: hostname.to_string(),
        reason,
    };

    let mut addrs = tokio::net::lookup_host((hostname, 0))
        .await
        .map_err(|e| resolution_error(e.to_string()))?;

    let addr = addrs
        .next()
        .ok_or_else(|| resolution_error("no addresses returned".into()))?;

    debug!("Resolved {} to {}", hostname, addr.ip());
    Ok(addr.ip())
}
