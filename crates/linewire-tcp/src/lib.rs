//! # linewire TCP connection
//!
//! A persistent, bidirectional, newline-delimited TCP client connection.
//!
//! ## Features
//!
//! - **Non-blocking API**: `send` and `receive_next` only touch in-memory queues
//! - **Background Pumps**: one send and one receive task per connection
//! - **Line Framing**: `\n`-terminated messages, reassembled across reads
//! - **Best-effort Connect**: failed construction yields an unbound connection
//! - **Graceful Shutdown**: `close` joins both pumps before the socket goes away
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use linewire_tcp::Connection;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let connection = Connection::connect("localhost", "2112").await;
//!     if !connection.is_bound() {
//!         eprintln!("not connected: {:?}", connection.last_error());
//!         return;
//!     }
//!
//!     connection.send("ping");
//!     if let Some(reply) = connection.wait_next(Duration::from_secs(1)).await {
//!         println!("{reply}");
//!     }
//!     connection.close().await;
//! }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod builder;
mod codec;
mod connection;
mod pump;
mod resolver;

pub use builder::ConnectionBuilder;
pub use codec::{DELIMITER, LineCodec};
pub use connection::Connection;
pub use resolver::resolve_host;

// Re-export core types for convenience
pub use linewire_core::{
    ConnectionConfig, ConnectionError, ConnectionMetrics, ConnectionResult, ConnectionState,
};
