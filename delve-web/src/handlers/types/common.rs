//! Types shared by several handlers

use delve_core::{ConfigOverrides, DelveResult, Message, Provider, Role};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "delve-dual-model-chat")]
    pub service: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error body for rejected requests
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Bad request: Unsupported model provider: openai")]
    pub error: String,
}

/// One earlier turn of the conversation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationMessage {
    /// `user`, `assistant` or `system`; anything else counts as an assistant turn
    #[schema(example = "user")]
    pub role: String,
    #[schema(example = "What is the borrow checker?")]
    pub content: String,
}

impl From<&ConversationMessage> for Message {
    fn from(message: &ConversationMessage) -> Self {
        let role = match message.role.trim().to_ascii_lowercase().as_str() {
            "user" | "human" => Role::User,
            "system" => Role::System,
            _ => Role::Assistant,
        };
        Message::new(role, message.content.clone())
    }
}

pub fn to_messages(history: &[ConversationMessage]) -> Vec<Message> {
    history.iter().map(Message::from).collect()
}

/// Per-request provider and model choices
///
/// Provider names are `gemini` or `siliconflow`, case-insensitive.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RequestOverrides {
    #[schema(example = "siliconflow")]
    pub model_provider: Option<String>,
    pub query_generator_provider: Option<String>,
    pub reflection_provider: Option<String>,
    pub answer_provider: Option<String>,
    pub chat_provider: Option<String>,
    pub query_generator_model: Option<String>,
    pub reflection_model: Option<String>,
    pub answer_model: Option<String>,
    #[schema(example = "gemini-2.0-flash")]
    pub chat_model: Option<String>,
    pub siliconflow_query_model: Option<String>,
    pub siliconflow_reflection_model: Option<String>,
    pub siliconflow_answer_model: Option<String>,
    pub siliconflow_chat_model: Option<String>,
}

impl RequestOverrides {
    /// Parse provider names; an unknown provider is an error
    pub fn to_config_overrides(&self) -> DelveResult<ConfigOverrides> {
        let provider = |value: &Option<String>| -> DelveResult<Option<Provider>> {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(str::parse::<Provider>)
                .transpose()
        };

        Ok(ConfigOverrides {
            model_provider: provider(&self.model_provider)?,
            query_generator_provider: provider(&self.query_generator_provider)?,
            reflection_provider: provider(&self.reflection_provider)?,
            answer_provider: provider(&self.answer_provider)?,
            chat_provider: provider(&self.chat_provider)?,
            query_generator_model: self.query_generator_model.clone(),
            reflection_model: self.reflection_model.clone(),
            answer_model: self.answer_model.clone(),
            chat_model: self.chat_model.clone(),
            siliconflow_query_model: self.siliconflow_query_model.clone(),
            siliconflow_reflection_model: self.siliconflow_reflection_model.clone(),
            siliconflow_answer_model: self.siliconflow_answer_model.clone(),
            siliconflow_chat_model: self.siliconflow_chat_model.clone(),
            ..Default::default()
        })
    }
}
