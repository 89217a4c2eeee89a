//! Realtime connection manager.
//!
//! Owns at most one live transport connection, retries abnormal closures
//! with bounded linear backoff, and fans inbound `{type, payload}` frames
//! out to listeners registered by event name.

mod client;
mod connection;
mod handler;
mod state;
mod types;


pub use client::ConnectionManager;
pub use types::{ConnectionState, ManagerConfig, DEFAULT_URL};
