//! Chat session layered on the connection manager.
//!
//! [`ChatSession`] subscribes to the chat events, folds them into a
//! [`ChatState`], and wraps the outbound chat requests.

mod session;
mod state;

pub use session::{default_chat_name, ChatSession};
pub use state::ChatState;
