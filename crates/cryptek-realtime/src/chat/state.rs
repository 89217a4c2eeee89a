//! Client-side view of the user's chats.

use crate::protocol::{ChatMessage, ChatRoom};

/// Everything the session has learned from the server so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    pub connected: bool,
    /// Address reported by the last `connected` event.
    pub user_address: Option<String>,
    /// Messages in arrival order, across all chats.
    pub messages: Vec<ChatMessage>,
    /// Chats in creation order.
    pub chats: Vec<ChatRoom>,
    pub selected_chat: Option<String>,
}

impl ChatState {
    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn add_chat(&mut self, room: ChatRoom) {
        self.chats.push(room);
    }

    /// Replace the chat with the same id. Returns false for an unknown chat,
    /// which is left out of the state.
    pub fn update_chat(&mut self, room: ChatRoom) -> bool {
        match self.chats.iter_mut().find(|existing| existing.id == room.id) {
            Some(existing) => {
                *existing = room;
                true
            }
            None => false,
        }
    }

    pub fn chat(&self, chat_id: &str) -> Option<&ChatRoom> {
        self.chats.iter().find(|room| room.id == chat_id)
    }

    /// Messages of one chat, oldest first.
    pub fn messages_in(&self, chat_id: &str) -> Vec<&ChatMessage> {
        self.messages
            .iter()
            .filter(|msg| msg.chat_id == chat_id)
            .collect()
    }

    /// Messages of the selected chat; empty when nothing is selected.
    pub fn selected_messages(&self) -> Vec<&ChatMessage> {
        match &self.selected_chat {
            Some(chat_id) => self.messages_in(chat_id),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, chat_id: &str) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            chat_id: chat_id.into(),
            sender: "0xabc".into(),
            content: format!("body of {id}"),
            timestamp: 1_700_000_000_000,
            encrypted: true,
            cid: None,
        }
    }

    fn room(id: &str, name: &str) -> ChatRoom {
        ChatRoom {
            id: id.into(),
            name: name.into(),
            participants: vec!["0xabc".into(), "0xdef".into()],
            last_message: None,
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn messages_are_filtered_per_chat_in_arrival_order() {
        let mut state = ChatState::default();
        state.push_message(message("m1", "a"));
        state.push_message(message("m2", "b"));
        state.push_message(message("m3", "a"));

        let ids: Vec<&str> = state.messages_in("a").iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
        assert!(state.messages_in("zzz").is_empty());
    }

    #[test]
    fn selected_messages_follow_selection() {
        let mut state = ChatState::default();
        state.push_message(message("m1", "a"));
        state.push_message(message("m2", "b"));
        assert!(state.selected_messages().is_empty());

        state.selected_chat = Some("b".into());
        let ids: Vec<&str> = state.selected_messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2"]);
    }

    #[test]
    fn update_replaces_known_chat_only() {
        let mut state = ChatState::default();
        state.add_chat(room("c1", "first"));
        state.add_chat(room("c2", "second"));

        assert!(state.update_chat(room("c2", "renamed")));
        assert_eq!(state.chat("c2").unwrap().name, "renamed");
        assert_eq!(state.chats.len(), 2);

        assert!(!state.update_chat(room("c9", "ghost")));
        assert!(state.chat("c9").is_none());
    }
}
