//! Wire protocol for the Cryptek chat server.
//!
//! Every frame in both directions is a JSON envelope `{type, payload}`.
//! The payload structs below are the application-level bodies that ride
//! inside it; field names are camelCase on the wire.

use cryptek_common::CryptekError;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Event names carried in the envelope `type` field.
pub mod events {
    // Connection state, emitted locally by the manager (and accepted from
    // the server as well).
    pub const CONNECTED: &str = "connected";
    pub const DISCONNECTED: &str = "disconnected";
    pub const ERROR: &str = "error";

    // Inbound domain events.
    pub const NEW_MESSAGE: &str = "new_message";
    pub const CHAT_CREATED: &str = "chat_created";
    pub const CHAT_UPDATED: &str = "chat_updated";

    // Outbound requests.
    pub const SEND_MESSAGE: &str = "send_message";
    pub const CREATE_CHAT: &str = "create_chat";
    pub const JOIN_CHAT: &str = "join_chat";
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The `{type, payload}` structure used for all transport messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// Parse an inbound text frame.
    ///
    /// Fails on non-JSON input, a missing or non-string `type`, or an empty
    /// event name. A missing payload decodes as `null`.
    pub fn parse(text: &str) -> Result<Self, CryptekError> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| CryptekError::Protocol(format!("invalid envelope: {e}")))?;
        if envelope.event.is_empty() {
            return Err(CryptekError::Protocol("envelope has an empty type".into()));
        }
        Ok(envelope)
    }

    pub fn to_json(&self) -> Result<String, CryptekError> {
        serde_json::to_string(self)
            .map_err(|e| CryptekError::Protocol(format!("failed to encode envelope: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Domain entities
// ---------------------------------------------------------------------------

/// A chat message as delivered by `new_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: String,
    pub sender: String,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub encrypted: bool,
    /// Content identifier of the stored payload, when the body lives in
    /// decentralized storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
}

/// A chat room as delivered by `chat_created` / `chat_updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<ChatMessage>,
    pub created_at: i64,
}

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub chat_id: String,
    pub content: String,
    pub encrypted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatPayload {
    pub participant_address: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinChatPayload {
    pub chat_id: String,
}

// ---------------------------------------------------------------------------
// Connection-state payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    pub user_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedPayload {
    /// False once the manager has stopped for good (explicit disconnect or
    /// reconnect ceiling reached).
    pub will_reconnect: bool,
    /// Reconnect attempt number scheduled (or last made, when terminal).
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}
