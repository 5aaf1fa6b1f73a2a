//! Chat request types

use super::common::{ConversationMessage, RequestOverrides};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Dual-model chat request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DualModelChatRequest {
    #[schema(example = "Explain Rust lifetimes with an example")]
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationMessage>,
}

/// Single-model chat request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    #[schema(example = "What does Pin guarantee?")]
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationMessage>,
    pub overrides: Option<RequestOverrides>,
}
