//! Public handle for the realtime connection.

use std::sync::Arc;

use cryptek_common::{ListenerId, SessionKey};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::connection::Driver;
use super::state::Shared;
use super::types::{ConnectionState, ManagerConfig};
use crate::listeners::Listener;
use crate::protocol::{events, DisconnectedPayload, Envelope};
use crate::transport::{Connector, WsConnector};

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Owns one realtime connection and its listener registry.
///
/// Methods never return transport errors: failures are reported through
/// the `connected` / `disconnected` / `error` events. Only `disconnect` can
/// wait, and only for a listener that is already running.
/// `connect` must be called from within a tokio runtime.
pub struct ConnectionManager {
    config: ManagerConfig,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Create a manager that connects over WebSocket.
    pub fn new(config: ManagerConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    /// Create a manager with a custom transport.
    pub fn with_connector(config: ManagerConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Open a connection scoped to `key`.
    ///
    /// No-op while a connection is open or a connect/reconnect cycle is in
    /// progress.
    pub fn connect(&self, key: impl Into<SessionKey>) {
        let key = key.into();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "connect called outside a tokio runtime");
                return;
            }
        };

        let mut link = self.shared.lock();
        if link.state.is_active() {
            debug!(state = %link.state, session = %key, "connect ignored, connection already active");
            return;
        }

        link.generation += 1;
        link.attempts = 0;
        link.state = ConnectionState::Connecting;
        link.session = Some(key.clone());
        let cancel = CancellationToken::new();
        link.cancel = Some(cancel.clone());

        let driver = Driver {
            generation: link.generation,
            url: self.config.session_url(&key),
            session: key,
            policy: self.config.reconnect_policy(),
            connect_timeout: self.config.connect_timeout,
            connector: Arc::clone(&self.connector),
            shared: Arc::clone(&self.shared),
            cancel,
        };
        drop(link);

        runtime.spawn(driver.run());
    }

    /// Close the connection and cancel any pending reconnect.
    ///
    /// Safe to call when already disconnected. Never triggers the
    /// reconnect policy.
    pub fn disconnect(&self) {
        let (cancel, was_connected, session) = {
            let mut link = self.shared.lock();
            if !link.state.is_active() && link.cancel.is_none() {
                link.session = None;
                return;
            }
            link.generation += 1;
            let was_connected = link.state == ConnectionState::Connected;
            link.state = ConnectionState::Disconnected;
            link.attempts = 0;
            link.outbound = None;
            (link.cancel.take(), was_connected, link.session.take())
        };

        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        info!(
            session = %session.as_ref().map(SessionKey::as_str).unwrap_or(""),
            "disconnected by request"
        );

        if was_connected {
            let payload = DisconnectedPayload {
                will_reconnect: false,
                attempt: 0,
                reason: Some("disconnect requested".into()),
            };
            // Waits out any delivery the old driver started before the
            // generation changed, so this is the last event of the session.
            if let Ok(value) = serde_json::to_value(&payload) {
                self.shared
                    .deliver(|| self.shared.listeners.emit(events::DISCONNECTED, &value));
            }
        }
    }

    /// Send `{type: event, payload}` if connected.
    ///
    /// While not connected the frame is dropped with a warning; nothing is
    /// queued. Returns whether the frame was handed to the transport.
    pub fn send(&self, event: &str, payload: serde_json::Value) -> bool {
        let text = match Envelope::new(event, payload).to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(event = %event, error = %e, "message not sent");
                return false;
            }
        };

        let outbound = {
            let link = self.shared.lock();
            match (link.state, &link.outbound) {
                (ConnectionState::Connected, Some(tx)) => Some(tx.clone()),
                _ => None,
            }
        };

        match outbound {
            Some(tx) if tx.send(text).is_ok() => true,
            _ => {
                warn!(event = %event, "not connected, message not sent");
                false
            }
        }
    }

    /// Serialize `payload` and [`send`](Self::send) it.
    pub fn send_event<T: Serialize>(&self, event: &str, payload: &T) -> bool {
        match serde_json::to_value(payload) {
            Ok(value) => self.send(event, value),
            Err(e) => {
                warn!(event = %event, error = %e, "failed to encode payload, message not sent");
                false
            }
        }
    }

    /// Register a closure for `event`.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.shared.listeners.on(event, Arc::new(callback))
    }

    /// Register a shared listener handle for `event`. Registering the same
    /// handle twice returns the original id.
    pub fn on_listener(&self, event: &str, listener: Listener) -> ListenerId {
        self.shared.listeners.on(event, listener)
    }

    /// Unregister a listener. Unknown ids are ignored.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.shared.listeners.off(event, id)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.shared.listeners.listener_count(event)
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Reconnect attempts made since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.lock().attempts
    }

    /// Key of the active session, if any.
    pub fn session_key(&self) -> Option<SessionKey> {
        self.shared.lock().session.clone()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let mut link = self.shared.lock();
        link.generation += 1;
        if let Some(cancel) = link.cancel.take() {
            cancel.cancel();
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let link = self.shared.lock();
        f.debug_struct("ConnectionManager")
            .field("url", &self.config.url)
            .field("state", &link.state)
            .field("attempts", &link.attempts)
            .field("session", &link.session)
            .finish()
    }
}
