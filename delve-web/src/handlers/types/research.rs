//! Research request types

use super::common::{ConversationMessage, RequestOverrides};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Web research request
///
/// `message` is appended to `conversation_history` as the latest user turn.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResearchRequest {
    #[schema(example = "What changed in the latest Rust edition?")]
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationMessage>,
    #[schema(example = 3)]
    pub initial_search_query_count: Option<usize>,
    #[schema(example = 2)]
    pub max_research_loops: Option<usize>,
    /// Model used for reflection and the final answer
    #[schema(example = "gemini-2.5-pro")]
    pub reasoning_model: Option<String>,
    pub overrides: Option<RequestOverrides>,
}
