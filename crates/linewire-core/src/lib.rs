//! # linewire core
//!
//! Foundation types shared by the linewire connection crates.
//!
//! ## Overview
//!
//! This crate defines:
//! - **Queue**: [`SafeQueue`], the mutex-guarded FIFO that bridges application
//!   calls and the background pumps
//! - **Types**: [`ConnectionState`], [`AtomicState`]
//! - **Errors**: [`ConnectionError`], [`ConnectionResult`]
//! - **Config**: [`ConnectionConfig`], [`ConfigError`]
//! - **Metrics**: [`ConnectionMetrics`], [`AtomicMetrics`]
//!
//! Nothing here touches a socket; the TCP connection itself lives in
//! `linewire-tcp`.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod config;
mod error;
mod metrics;
mod queue;
mod types;

pub use config::{ConfigError, ConnectionConfig};
pub use error::{ConnectionError, ConnectionResult};
pub use metrics::{AtomicMetrics, ConnectionMetrics};
pub use queue::SafeQueue;
pub use types::{AtomicState, ConnectionState};
