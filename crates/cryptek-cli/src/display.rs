//! Terminal rendering of chat events.

use chrono::{DateTime, Local, Utc};
use cryptek_realtime::{ChatMessage, ChatRoom};
use serde_json::Value;

/// Shorten an address to its first `n` characters.
pub fn short(address: &str, n: usize) -> String {
    if address.chars().count() <= n {
        return address.to_string();
    }
    let prefix: String = address.chars().take(n).collect();
    format!("{prefix}…")
}

fn clock(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

pub fn message_line(msg: &ChatMessage) -> String {
    let lock = if msg.encrypted { "🔒 " } else { "" };
    format!(
        "[{}] #{} <{}> {lock}{}",
        clock(msg.timestamp),
        short(&msg.chat_id, 8),
        short(&msg.sender, 10),
        msg.content
    )
}

pub fn chat_line(room: &ChatRoom, selected: bool) -> String {
    let marker = if selected { '*' } else { ' ' };
    let participants: Vec<String> = room.participants.iter().map(|p| short(p, 10)).collect();
    format!(
        "{marker} {}  {}  [{}]",
        room.id,
        room.name,
        participants.join(", ")
    )
}

pub fn disconnected_line(payload: &Value) -> String {
    let reason = payload["reason"].as_str().unwrap_or("connection lost");
    if payload["willReconnect"].as_bool().unwrap_or(false) {
        format!(
            "-- disconnected ({reason}), reconnect attempt {}",
            payload["attempt"].as_u64().unwrap_or(0)
        )
    } else {
        format!("-- disconnected ({reason})")
    }
}
