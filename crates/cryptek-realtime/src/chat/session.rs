//! Chat session: listeners, state, and outbound chat requests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cryptek_common::{new_id, ListenerId, SessionKey};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::state::ChatState;
use crate::manager::ConnectionManager;
use crate::protocol::{
    events, ChatMessage, ChatRoom, ConnectedPayload, CreateChatPayload, JoinChatPayload,
    SendMessagePayload,
};

/// Name used for a new chat when the caller gives none.
pub fn default_chat_name(participant: &str) -> String {
    let prefix: String = participant.chars().take(8).collect();
    format!("Chat with {prefix}...")
}

/// A user's chat session over a shared [`ConnectionManager`].
///
/// `start` subscribes to `connected`, `disconnected`, `new_message`,
/// `chat_created` and `chat_updated` before connecting; `stop` removes
/// exactly those subscriptions and disconnects.
pub struct ChatSession {
    /// Local id tagging this session's log lines.
    id: String,
    manager: Arc<ConnectionManager>,
    state: Arc<Mutex<ChatState>>,
    registrations: Mutex<Vec<(&'static str, ListenerId)>>,
}

impl ChatSession {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            id: new_id(),
            manager,
            state: Arc::new(Mutex::new(ChatState::default())),
            registrations: Mutex::new(Vec::new()),
        }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Subscribe to chat events and connect as `address`.
    pub fn start(&self, address: impl Into<SessionKey>) {
        let address = address.into();
        {
            let mut registrations = lock(&self.registrations);
            if registrations.is_empty() {
                *registrations = self.subscribe();
            }
        }
        info!(session = %self.id, address = %address, "starting chat session");
        self.manager.connect(address);
    }

    /// Unsubscribe and disconnect. Accumulated chats and messages are kept.
    pub fn stop(&self) {
        let registrations = std::mem::take(&mut *lock(&self.registrations));
        for (event, id) in registrations {
            self.manager.off(event, id);
        }
        self.manager.disconnect();
        lock(&self.state).connected = false;
        info!(session = %self.id, "chat session stopped");
    }

    fn subscribe(&self) -> Vec<(&'static str, ListenerId)> {
        let mut registrations = Vec::with_capacity(5);

        let state = Arc::clone(&self.state);
        let id = self.manager.on(events::CONNECTED, move |payload| {
            let mut state = lock(&state);
            state.connected = true;
            if let Some(connected) = decode::<ConnectedPayload>(events::CONNECTED, payload) {
                state.user_address = Some(connected.user_address);
            }
        });
        registrations.push((events::CONNECTED, id));

        let state = Arc::clone(&self.state);
        let id = self.manager.on(events::DISCONNECTED, move |_| {
            lock(&state).connected = false;
        });
        registrations.push((events::DISCONNECTED, id));

        let state = Arc::clone(&self.state);
        let id = self.manager.on(events::NEW_MESSAGE, move |payload| {
            if let Some(message) = decode::<ChatMessage>(events::NEW_MESSAGE, payload) {
                lock(&state).push_message(message);
            }
        });
        registrations.push((events::NEW_MESSAGE, id));

        let state = Arc::clone(&self.state);
        let id = self.manager.on(events::CHAT_CREATED, move |payload| {
            if let Some(room) = decode::<ChatRoom>(events::CHAT_CREATED, payload) {
                lock(&state).add_chat(room);
            }
        });
        registrations.push((events::CHAT_CREATED, id));

        let state = Arc::clone(&self.state);
        let id = self.manager.on(events::CHAT_UPDATED, move |payload| {
            if let Some(room) = decode::<ChatRoom>(events::CHAT_UPDATED, payload) {
                let chat_id = room.id.clone();
                if !lock(&state).update_chat(room) {
                    debug!(chat_id = %chat_id, "update for unknown chat ignored");
                }
            }
        });
        registrations.push((events::CHAT_UPDATED, id));

        registrations
    }

    // -- Outbound ------------------------------------------------------------

    /// Send a message to `chat_id`. Dropped when not connected.
    pub fn send_message(&self, chat_id: &str, content: &str, encrypted: bool) -> bool {
        self.manager.send_event(
            events::SEND_MESSAGE,
            &SendMessagePayload {
                chat_id: chat_id.to_string(),
                content: content.to_string(),
                encrypted,
            },
        )
    }

    /// Send a message to the selected chat. False when nothing is selected.
    pub fn send_to_selected(&self, content: &str, encrypted: bool) -> bool {
        let selected = lock(&self.state).selected_chat.clone();
        match selected {
            Some(chat_id) => self.send_message(&chat_id, content, encrypted),
            None => {
                warn!("no chat selected, message not sent");
                false
            }
        }
    }

    /// Ask the server to create a chat with `participant`.
    pub fn create_chat(&self, participant: &str, name: Option<&str>) -> bool {
        let name = match name {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => default_chat_name(participant),
        };
        self.manager.send_event(
            events::CREATE_CHAT,
            &CreateChatPayload {
                participant_address: participant.to_string(),
                name,
            },
        )
    }

    pub fn join_chat(&self, chat_id: &str) -> bool {
        self.manager.send_event(
            events::JOIN_CHAT,
            &JoinChatPayload {
                chat_id: chat_id.to_string(),
            },
        )
    }

    // -- State ---------------------------------------------------------------

    pub fn select_chat(&self, chat_id: Option<String>) {
        lock(&self.state).selected_chat = chat_id;
    }

    pub fn selected_chat(&self) -> Option<String> {
        lock(&self.state).selected_chat.clone()
    }

    pub fn state_snapshot(&self) -> ChatState {
        lock(&self.state).clone()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        let registrations = std::mem::take(&mut *lock(&self.registrations));
        for (event, id) in registrations {
            self.manager.off(event, id);
        }
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("manager", &self.manager)
            .field("subscriptions", &lock(&self.registrations).len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn decode<T: DeserializeOwned>(event: &str, payload: &serde_json::Value) -> Option<T> {
    match T::deserialize(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(event = %event, error = %e, "ignoring undecodable payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use cryptek_common::TransportError;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    use super::*;
    use crate::manager::ManagerConfig;
    use crate::transport::{memory_link, Connector, Link, MemoryPeer};

    /// Always opens an in-memory link and hands its peer to the test.
    struct PeerConnector(mpsc::UnboundedSender<MemoryPeer>);

    #[async_trait]
    impl Connector for PeerConnector {
        async fn connect(&self, _url: &str) -> Result<Link, TransportError> {
            let (link, peer) = memory_link();
            self.0.send(peer).map_err(|_| TransportError::Closed)?;
            Ok(link)
        }
    }

    fn session() -> (ChatSession, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = ManagerConfig {
            reconnect_delay: Duration::from_millis(100),
            ..ManagerConfig::default()
        };
        let manager = ConnectionManager::with_connector(config, Arc::new(PeerConnector(tx)));
        (ChatSession::new(Arc::new(manager)), rx)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    async fn started(address: &str) -> (ChatSession, MemoryPeer) {
        let (session, mut peers) = session();
        session.start(address);
        let peer = peers.recv().await.unwrap();
        settle().await;
        (session, peer)
    }

    fn frame(event: &str, payload: Value) -> String {
        json!({"type": event, "payload": payload}).to_string()
    }

    fn sent(peer: &mut MemoryPeer) -> Value {
        serde_json::from_str(&peer.try_recv().expect("a frame was sent")).unwrap()
    }

    #[test]
    fn default_name_uses_first_eight_chars() {
        assert_eq!(default_chat_name("0x1234567890abcdef"), "Chat with 0x123456...");
        assert_eq!(default_chat_name("0xab"), "Chat with 0xab...");
    }

    #[tokio::test(start_paused = true)]
    async fn start_connects_and_tracks_state() {
        let (session, _peer) = started("0xabc").await;

        assert!(session.is_connected());
        let state = session.state_snapshot();
        assert_eq!(state.user_address.as_deref(), Some("0xabc"));
        assert_eq!(session.manager().listener_count(events::NEW_MESSAGE), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_events_fold_into_state() {
        let (session, peer) = started("0xabc").await;

        peer.push(frame(
            events::CHAT_CREATED,
            json!({"id": "c1", "name": "Chat", "participants": ["0xabc", "0xdef"], "createdAt": 1}),
        ));
        peer.push(frame(
            events::NEW_MESSAGE,
            json!({
                "id": "m1", "chatId": "c1", "sender": "0xdef", "content": "hi",
                "timestamp": 2, "encrypted": true
            }),
        ));
        peer.push(frame(
            events::CHAT_UPDATED,
            json!({"id": "c1", "name": "Renamed", "participants": [], "createdAt": 1}),
        ));
        peer.push(frame(
            events::CHAT_UPDATED,
            json!({"id": "c404", "name": "Ghost", "createdAt": 1}),
        ));
        // Wrong shape: logged and ignored.
        peer.push(frame(events::NEW_MESSAGE, json!({"id": 7})));
        settle().await;

        session.select_chat(Some("c1".into()));
        let state = session.state_snapshot();
        assert_eq!(state.chats.len(), 1);
        assert_eq!(state.chats[0].name, "Renamed");
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.selected_messages()[0].content, "hi");
    }

    #[tokio::test(start_paused = true)]
    async fn outbound_requests_use_wire_shapes() {
        let (session, mut peer) = started("0xabc").await;

        assert!(session.create_chat("0x1234567890abcdef", None));
        assert!(session.create_chat("0xdef", Some("Team")));
        assert!(session.join_chat("c1"));
        assert!(session.send_message("c1", "secret", true));
        settle().await;

        assert_eq!(
            sent(&mut peer),
            json!({"type": "create_chat", "payload": {
                "participantAddress": "0x1234567890abcdef", "name": "Chat with 0x123456..."
            }})
        );
        assert_eq!(sent(&mut peer)["payload"]["name"], json!("Team"));
        assert_eq!(
            sent(&mut peer),
            json!({"type": "join_chat", "payload": {"chatId": "c1"}})
        );
        assert_eq!(
            sent(&mut peer),
            json!({"type": "send_message", "payload": {
                "chatId": "c1", "content": "secret", "encrypted": true
            }})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn send_to_selected_requires_a_selection() {
        let (session, mut peer) = started("0xabc").await;

        assert!(!session.send_to_selected("lost", false));
        session.select_chat(Some("c2".into()));
        assert!(session.send_to_selected("public", false));
        settle().await;

        let frame = sent(&mut peer);
        assert_eq!(frame["payload"]["chatId"], json!("c2"));
        assert_eq!(frame["payload"]["encrypted"], json!(false));
        assert_eq!(peer.try_recv(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_while_disconnected_are_dropped() {
        let (session, _peers) = session();
        assert!(!session.join_chat("c1"));
        assert!(!session.create_chat("0xdef", None));
        assert!(!session.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_unsubscribes_and_disconnects() {
        let (session, mut peer) = started("0xabc").await;

        session.stop();
        settle().await;

        assert!(!session.is_connected());
        assert!(!session.manager().is_connected());
        for event in [
            events::CONNECTED,
            events::DISCONNECTED,
            events::NEW_MESSAGE,
            events::CHAT_CREATED,
            events::CHAT_UPDATED,
        ] {
            assert_eq!(session.manager().listener_count(event), 0, "{event}");
        }
        assert_eq!(peer.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_does_not_duplicate_subscriptions() {
        let (session, mut peers) = session();
        session.start("0xabc");
        session.start("0xabc");
        let _peer = peers.recv().await.unwrap();
        settle().await;

        assert_eq!(session.manager().listener_count(events::CHAT_CREATED), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_close_clears_connected_flag_until_reconnect() {
        let (session, mut peers) = session();
        session.start("0xabc");
        let first = peers.recv().await.unwrap();
        settle().await;
        assert!(session.is_connected());

        first.close();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!session.is_connected());

        let _second = peers.recv().await.unwrap();
        settle().await;
        assert!(session.is_connected());
    }
}
