use serde::{Deserialize, Serialize};

/// Endpoint used when neither the config file nor the environment names one.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080";

/// Realtime transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSection {
    /// WebSocket URL of the chat server. The session key is appended as
    /// the `address` query parameter.
    pub url: String,
    /// Consecutive abnormal closures retried before giving up (valid range: 0-50).
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay in milliseconds; attempt `n` waits `n` times this (10-60000).
    pub reconnect_delay_ms: u64,
    /// Connection handshake timeout in seconds (1-120).
    pub connect_timeout_secs: u64,
}

impl Default for RealtimeSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.into(),
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 1000,
            connect_timeout_secs: 15,
        }
    }
}
