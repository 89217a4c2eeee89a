//! Realtime client for the Cryptek chat server.
//!
//! [`ConnectionManager`] keeps one WebSocket connection per user address,
//! dispatches inbound `{type, payload}` events to registered listeners, and
//! reconnects with linear backoff after abnormal closures.
//! [`ChatSession`] builds chat state on top of it.

pub mod backoff;
pub mod chat;
pub mod listeners;
pub mod manager;
pub mod protocol;
pub mod transport;

pub use backoff::ReconnectPolicy;
pub use chat::{ChatSession, ChatState};
pub use listeners::{Listener, ListenerRegistry};
pub use manager::{ConnectionManager, ConnectionState, ManagerConfig};
pub use protocol::{events, ChatMessage, ChatRoom, Envelope};
pub use transport::{memory_link, Connector, Link, MemoryPeer, WsConnector};
