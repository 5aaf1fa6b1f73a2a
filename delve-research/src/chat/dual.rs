//! Dual-model chat
//!
//! Gemini and SiliconFlow answer the same conversation concurrently, then the
//! SiliconFlow chat model merges both replies into one answer.

use super::build_conversation;
use crate::prompts::create_integration_prompt;
use delve_core::{with_timeout, DelveConfig, DelveResult, Message, Provider};
use delve_llm::{ModelFactory, ProviderModelFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

const BRANCH_TEMPERATURE: f32 = 0.7;
const MERGE_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ProcessingStage {
    ParallelQuery,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DualModelOutcome {
    pub gemini_response: String,
    pub siliconflow_response: String,
    /// Merged answer, or the error text when `success` is false
    pub integrated_response: String,
    pub processing_stage: ProcessingStage,
    pub success: bool,
    pub error_message: Option<String>,
}

impl DualModelOutcome {
    fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            gemini_response: String::new(),
            siliconflow_response: String::new(),
            integrated_response: message.clone(),
            processing_stage: ProcessingStage::Error,
            success: false,
            error_message: Some(message),
        }
    }

    /// Merged answer followed by both individual replies, for display
    pub fn transcript(&self) -> String {
        if !self.success {
            return self.integrated_response.clone();
        }

        format!(
            "**Dual-model answer**\n\n{}\n\n---\n**Individual answers**\n\n**Gemini:**\n{}\n\n**SiliconFlow:**\n{}",
            self.integrated_response, self.gemini_response, self.siliconflow_response
        )
    }
}

pub struct DualModelChat {
    config: DelveConfig,
    factory: Arc<dyn ModelFactory>,
}

impl DualModelChat {
    pub fn new(config: DelveConfig) -> Self {
        Self::with_factory(config, Arc::new(ProviderModelFactory::new()))
    }

    pub fn with_factory(config: DelveConfig, factory: Arc<dyn ModelFactory>) -> Self {
        Self { config, factory }
    }

    /// Ask both providers, then merge their replies
    pub async fn chat(&self, message: &str, history: &[Message]) -> DualModelOutcome {
        for provider in [Provider::Gemini, Provider::SiliconFlow] {
            if let Err(e) = self.config.require_key(provider) {
                warn!(provider = %provider, "Dual-model chat needs both API keys");
                return DualModelOutcome::error(format!("Configuration error: {}", e));
            }
        }

        let question = message.trim();
        if question.is_empty() {
            return DualModelOutcome::error("Sorry, no message was received");
        }

        let conversation = build_conversation(history, question);
        let branch_timeout_ms = self.config.llm.dual_branch_timeout_secs * 1000;

        let (gemini, siliconflow) = tokio::join!(
            with_timeout(
                self.ask(Provider::Gemini, &conversation),
                branch_timeout_ms,
                "gemini_branch"
            ),
            with_timeout(
                self.ask(Provider::SiliconFlow, &conversation),
                branch_timeout_ms,
                "siliconflow_branch"
            ),
        );

        let gemini = gemini.and_then(|r| r);
        let siliconflow = siliconflow.and_then(|r| r);
        let both_failed = gemini.is_err() && siliconflow.is_err();

        let gemini_response = gemini.unwrap_or_else(|e| {
            warn!(error = %e, "Gemini branch failed");
            format!("Gemini model call failed: {}", e)
        });
        let siliconflow_response = siliconflow.unwrap_or_else(|e| {
            warn!(error = %e, "SiliconFlow branch failed");
            format!("SiliconFlow model call failed: {}", e)
        });

        if both_failed {
            let message = "Both models failed to answer; nothing to merge".to_string();
            error!("{}", message);
            return DualModelOutcome {
                gemini_response,
                siliconflow_response,
                integrated_response: message.clone(),
                processing_stage: ProcessingStage::Error,
                success: false,
                error_message: Some(message),
            };
        }

        match self.merge(question, &gemini_response, &siliconflow_response).await {
            Ok(integrated) => {
                info!(chars = integrated.len(), "Dual-model answers merged");
                DualModelOutcome {
                    gemini_response,
                    siliconflow_response,
                    integrated_response: integrated,
                    processing_stage: ProcessingStage::Completed,
                    success: true,
                    error_message: None,
                }
            }
            Err(e) => {
                error!(error = %e, "Answer merge failed");
                let message = format!("Answer merge failed: {}", e);
                DualModelOutcome {
                    gemini_response,
                    siliconflow_response,
                    integrated_response: message.clone(),
                    processing_stage: ProcessingStage::Error,
                    success: false,
                    error_message: Some(message),
                }
            }
        }
    }

    async fn ask(&self, provider: Provider, conversation: &[Message]) -> DelveResult<String> {
        let model = match provider {
            Provider::Gemini => {
                self.factory
                    .create_gemini_model(&self.config, BRANCH_TEMPERATURE)
                    .await?
            }
            Provider::SiliconFlow => {
                self.factory
                    .create_siliconflow_model(&self.config, BRANCH_TEMPERATURE)
                    .await?
            }
        };
        model.generate(conversation).await
    }

    async fn merge(&self, question: &str, gemini: &str, siliconflow: &str) -> DelveResult<String> {
        let model = self
            .factory
            .create_siliconflow_model(&self.config, MERGE_TEMPERATURE)
            .await?;
        model
            .complete(&create_integration_prompt(question, gemini, siliconflow))
            .await
    }
}
