//! Single-model chat with the model configured for the chat stage

use super::build_conversation;
use delve_core::{ConfigOverrides, DelveConfig, Message, Stage};
use delve_llm::{ModelFactory, ModelRequest, ProviderModelFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const CHAT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SingleModelReply {
    pub response: String,
    #[cfg_attr(feature = "openapi", schema(example = "gemini"))]
    pub provider: String,
    #[cfg_attr(feature = "openapi", schema(example = "gemini-2.0-flash"))]
    pub model: String,
    pub success: bool,
    pub error_message: Option<String>,
}

pub struct SingleModelChat {
    config: DelveConfig,
    factory: Arc<dyn ModelFactory>,
}

impl SingleModelChat {
    pub fn new(config: DelveConfig) -> Self {
        Self::with_factory(config, Arc::new(ProviderModelFactory::new()))
    }

    pub fn with_factory(config: DelveConfig, factory: Arc<dyn ModelFactory>) -> Self {
        Self { config, factory }
    }

    pub async fn chat(
        &self,
        message: &str,
        history: &[Message],
        overrides: &ConfigOverrides,
    ) -> SingleModelReply {
        let config = self.config.with_overrides(overrides);
        let request = ModelRequest::new(Stage::Chat, CHAT_TEMPERATURE);
        let resolved = request.resolve(&config);

        let reply = |response: String, error_message: Option<String>| SingleModelReply {
            success: error_message.is_none(),
            response,
            provider: resolved.provider.to_string(),
            model: resolved.model.clone(),
            error_message,
        };

        if let Err(e) = config.require_key(resolved.provider) {
            let text = format!("Configuration error: {}", e);
            return reply(text.clone(), Some(text));
        }

        let question = message.trim();
        if question.is_empty() {
            let text = "Sorry, no message was received".to_string();
            return reply(text.clone(), Some(text));
        }

        let conversation = build_conversation(history, question);
        let result = match self.factory.create(&config, request).await {
            Ok(model) => model.generate(&conversation).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => {
                info!(provider = %resolved.provider, model = %resolved.model, "Chat reply generated");
                reply(text, None)
            }
            Err(e) => {
                warn!(error = %e, "Chat model call failed");
                reply(
                    format!("Sorry, something went wrong while answering: {}", e),
                    Some(e.to_string()),
                )
            }
        }
    }
}
