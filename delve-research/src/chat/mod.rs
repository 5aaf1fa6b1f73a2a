//! Conversational flows that answer directly, without web research

pub mod dual;
pub mod single;

pub use dual::{DualModelChat, DualModelOutcome, ProcessingStage};
pub use single::{SingleModelChat, SingleModelReply};

use delve_core::{conversation_window, Message, DEFAULT_HISTORY_WINDOW};

/// Recent history followed by the new user message
pub(crate) fn build_conversation(history: &[Message], message: &str) -> Vec<Message> {
    let mut messages = conversation_window(history, DEFAULT_HISTORY_WINDOW).to_vec();
    messages.push(Message::user(message));
    messages
}
