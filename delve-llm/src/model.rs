//! Chat model handles
//!
//! Wraps a siumai client behind [`ChatModel`] so pipelines and tests never
//! depend on a concrete provider.

use async_trait::async_trait;
use delve_core::{
    llm_error, retry_async, with_timeout, DelveResult, Message, Provider, RetryConfig, Role,
};
use futures::FutureExt;
use siumai::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Pause between retries of a failed model call
const RETRY_DELAY_MS: u64 = 1000;

/// A remote model that turns a conversation into one text reply
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, messages: &[Message]) -> DelveResult<String>;

    fn provider(&self) -> Provider;

    fn model(&self) -> &str;

    /// Single-prompt convenience
    async fn complete(&self, prompt: &str) -> DelveResult<String> {
        self.generate(&[Message::user(prompt)]).await
    }
}

/// [`ChatModel`] backed by a siumai client
pub struct SiumaiChatModel {
    client: Arc<dyn LlmClient>,
    provider: Provider,
    model: String,
    max_retries: usize,
    timeout_ms: u64,
}

impl SiumaiChatModel {
    pub fn new(
        client: Arc<dyn LlmClient>,
        provider: Provider,
        model: impl Into<String>,
        max_retries: usize,
        timeout_ms: u64,
    ) -> Self {
        Self {
            client,
            provider,
            model: model.into(),
            max_retries,
            timeout_ms,
        }
    }
}

fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|m| match m.role {
            Role::User => ChatMessage::user(m.content.clone()).build(),
            Role::Assistant => ChatMessage::assistant(m.content.clone()).build(),
            Role::System => ChatMessage::system(m.content.clone()).build(),
        })
        .collect()
}

#[async_trait]
impl ChatModel for SiumaiChatModel {
    async fn generate(&self, messages: &[Message]) -> DelveResult<String> {
        let start_time = Instant::now();
        debug!(
            provider = %self.provider,
            model = %self.model,
            messages = messages.len(),
            "Generating response"
        );

        let chat_messages = to_chat_messages(messages);
        let client = Arc::clone(&self.client);
        let (provider, model, timeout_ms) = (self.provider, self.model.clone(), self.timeout_ms);
        let operation = move || {
            let client = Arc::clone(&client);
            let chat_messages = chat_messages.clone();
            let model = model.clone();
            async move {
                with_timeout(client.chat(chat_messages), timeout_ms, "chat_model_generate")
                    .await
                    .and_then(|result| {
                        result.map_err(|e| {
                            llm_error!(
                                format!("LLM generation failed: {}", e),
                                provider,
                                model,
                                "chat_model"
                            )
                        })
                    })
            }
            .boxed()
        };

        let retry = RetryConfig::fixed(self.max_retries, RETRY_DELAY_MS);
        let response = retry_async(operation, retry, "chat_model_generate").await?;

        match response.content_text() {
            Some(content) => {
                info!(
                    provider = %self.provider,
                    model = %self.model,
                    chars = content.len(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Generated response"
                );
                Ok(content.to_string())
            }
            None => Err(llm_error!(
                "No text content in LLM response",
                self.provider,
                self.model,
                "chat_model"
            )),
        }
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }
}
