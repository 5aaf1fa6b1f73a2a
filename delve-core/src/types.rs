//! Conversation types shared by every pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of trailing messages forwarded to chat models
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        f.write_str(name)
    }
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Research topic derived from a conversation
///
/// A single message is used verbatim. Longer conversations are flattened into
/// `User: ...` / `Assistant: ...` lines; system messages are left out.
pub fn research_topic(messages: &[Message]) -> String {
    if let [only] = messages {
        return only.content.clone();
    }

    let mut topic = String::new();
    for message in messages {
        match message.role {
            Role::User => {
                topic.push_str("User: ");
                topic.push_str(&message.content);
                topic.push('\n');
            }
            Role::Assistant => {
                topic.push_str("Assistant: ");
                topic.push_str(&message.content);
                topic.push('\n');
            }
            Role::System => {}
        }
    }
    topic
}

/// The last `max_messages` messages
pub fn conversation_window(messages: &[Message], max_messages: usize) -> &[Message] {
    let start = messages.len().saturating_sub(max_messages);
    &messages[start..]
}
