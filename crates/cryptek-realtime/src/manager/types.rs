//! Configuration and state types for the connection manager.

use std::fmt;
use std::time::Duration;

use cryptek_common::SessionKey;

use crate::backoff::ReconnectPolicy;

/// Endpoint used when no configuration names one.
pub const DEFAULT_URL: &str = "ws://localhost:8080";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`ConnectionManager`](super::ConnectionManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Server endpoint; the session key is appended as `address=<key>`.
    pub url: String,
    /// Reconnect ceiling: retries after consecutive abnormal closures.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay; attempt `n` waits `n` times this.
    pub reconnect_delay: Duration,
    /// Connection handshake timeout.
    pub connect_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            max_reconnect_attempts: ReconnectPolicy::DEFAULT_MAX_ATTEMPTS,
            reconnect_delay: ReconnectPolicy::DEFAULT_BASE_DELAY,
            connect_timeout: Duration::from_secs(15),
        }
    }
}

impl ManagerConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(self.max_reconnect_attempts, self.reconnect_delay)
    }

    /// Build the connection URL scoped to `key`.
    pub(crate) fn session_url(&self, key: &SessionKey) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}address={key}", self.url)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Connection lifecycle.
///
/// `Disconnected -> Connecting -> Connected -> Reconnecting -> Connecting ...`
/// Reaching the reconnect ceiling, or an explicit disconnect, returns to
/// `Disconnected` with no timer pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    /// Whether a connection or reconnect cycle is in progress.
    pub fn is_active(self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}
