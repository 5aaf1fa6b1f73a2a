//! Model client factory
//!
//! Turns a stage plus sampling parameters into a ready [`ChatModel`] for
//! either supported provider.

use crate::grounding::{GeminiSearchClient, GroundedSearch};
use crate::model::{ChatModel, SiumaiChatModel};
use async_trait::async_trait;
use delve_core::{
    DelveConfig, DelveError, DelveResult, ErrorContext, Provider, Stage, StageModel,
};
use siumai::prelude::*;
use std::sync::Arc;
use tracing::info;

/// What a pipeline step asks the factory for
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub stage: Stage,
    pub temperature: f32,
    /// Falls back to `llm.max_retries` from the config
    pub max_retries: Option<usize>,
    pub provider_override: Option<Provider>,
    pub model_override: Option<String>,
}

impl ModelRequest {
    pub fn new(stage: Stage, temperature: f32) -> Self {
        Self {
            stage,
            temperature,
            max_retries: None,
            provider_override: None,
            model_override: None,
        }
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider_override = Some(provider);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Provider and model this request ends up using under `config`
    pub fn resolve(&self, config: &DelveConfig) -> StageModel {
        let provider = self
            .provider_override
            .unwrap_or_else(|| config.models.stage_provider(self.stage));
        let model = self
            .model_override
            .clone()
            .unwrap_or_else(|| config.models.model_for(self.stage, provider).to_string());

        StageModel {
            stage: self.stage,
            provider,
            model,
        }
    }
}

/// Builds model handles; pipelines hold this instead of concrete clients
#[async_trait]
pub trait ModelFactory: Send + Sync {
    async fn create(
        &self,
        config: &DelveConfig,
        request: ModelRequest,
    ) -> DelveResult<Arc<dyn ChatModel>>;

    /// Client for Google Search grounded generation
    fn searcher(&self, config: &DelveConfig) -> DelveResult<Arc<dyn GroundedSearch>>;

    /// Gemini handle for the chat stage
    async fn create_gemini_model(
        &self,
        config: &DelveConfig,
        temperature: f32,
    ) -> DelveResult<Arc<dyn ChatModel>> {
        self.create(
            config,
            ModelRequest::new(Stage::Chat, temperature).with_provider(Provider::Gemini),
        )
        .await
    }

    /// SiliconFlow handle for the chat stage
    async fn create_siliconflow_model(
        &self,
        config: &DelveConfig,
        temperature: f32,
    ) -> DelveResult<Arc<dyn ChatModel>> {
        self.create(
            config,
            ModelRequest::new(Stage::Chat, temperature).with_provider(Provider::SiliconFlow),
        )
        .await
    }
}

/// Production factory backed by siumai and the Gemini REST API
#[derive(Debug, Clone, Default)]
pub struct ProviderModelFactory {
    http: reqwest::Client,
}

impl ProviderModelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    async fn build_client(
        config: &DelveConfig,
        resolved: &StageModel,
        temperature: f32,
    ) -> DelveResult<Arc<dyn LlmClient>> {
        let api_key = config.require_key(resolved.provider)?;

        match resolved.provider {
            Provider::Gemini => {
                let client = LlmBuilder::new()
                    .gemini()
                    .api_key(&api_key)
                    .model(&resolved.model)
                    .temperature(temperature)
                    .build()
                    .await
                    .map_err(|e| build_error(resolved, e))?;

                Ok(Arc::new(client))
            }
            Provider::SiliconFlow => {
                let client = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .base_url(config.api.base_url_for(Provider::SiliconFlow))
                    .model(&resolved.model)
                    .temperature(temperature)
                    .build()
                    .await
                    .map_err(|e| build_error(resolved, e))?;

                Ok(Arc::new(client))
            }
        }
    }
}

fn build_error(resolved: &StageModel, error: LlmError) -> DelveError {
    DelveError::Llm {
        message: format!("Failed to build {} client: {}", resolved.provider, error),
        provider: Some(resolved.provider.to_string()),
        model: Some(resolved.model.clone()),
        context: ErrorContext::new("model_factory")
            .with_operation("build_client")
            .with_metadata("stage", resolved.stage.as_str()),
    }
}

#[async_trait]
impl ModelFactory for ProviderModelFactory {
    async fn create(
        &self,
        config: &DelveConfig,
        request: ModelRequest,
    ) -> DelveResult<Arc<dyn ChatModel>> {
        let resolved = request.resolve(config);
        let client = Self::build_client(config, &resolved, request.temperature).await?;

        info!(
            stage = %resolved.stage,
            provider = %resolved.provider,
            model = %resolved.model,
            temperature = request.temperature,
            "Created chat model"
        );

        Ok(Arc::new(SiumaiChatModel::new(
            client,
            resolved.provider,
            resolved.model,
            request.max_retries.unwrap_or(config.llm.max_retries),
            config.llm.request_timeout_secs * 1000,
        )))
    }

    fn searcher(&self, config: &DelveConfig) -> DelveResult<Arc<dyn GroundedSearch>> {
        let api_key = config.require_key(Provider::Gemini)?;
        let client = GeminiSearchClient::new(
            self.http.clone(),
            api_key,
            config.api.base_url_for(Provider::Gemini),
        )?
        .with_limits(config.llm.max_retries, config.llm.request_timeout_secs * 1000);

        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DelveConfig {
        let mut config = DelveConfig::default();
        config.models.reflection_provider = Some(Provider::SiliconFlow);
        config
    }

    #[test]
    fn test_resolve_without_overrides_follows_stage() {
        let resolved = ModelRequest::new(Stage::Reflection, 1.0).resolve(&config());
        assert_eq!(resolved.provider, Provider::SiliconFlow);
        assert_eq!(resolved.model, "Qwen/Qwen2.5-14B-Instruct");
    }

    #[test]
    fn test_provider_override_uses_that_providers_model() {
        let resolved = ModelRequest::new(Stage::Chat, 0.7)
            .with_provider(Provider::SiliconFlow)
            .resolve(&config());
        assert_eq!(resolved.provider, Provider::SiliconFlow);
        assert_eq!(resolved.model, "Qwen/Qwen2.5-7B-Instruct");
    }

    #[test]
    fn test_model_override_always_wins() {
        let resolved = ModelRequest::new(Stage::Answer, 0.0)
            .with_model("gemini-exp")
            .resolve(&config());
        assert_eq!(resolved.provider, Provider::Gemini);
        assert_eq!(resolved.model, "gemini-exp");

        let both = ModelRequest::new(Stage::Answer, 0.0)
            .with_provider(Provider::SiliconFlow)
            .with_model("deepseek-ai/DeepSeek-V3")
            .resolve(&config());
        assert_eq!(both.provider, Provider::SiliconFlow);
        assert_eq!(both.model, "deepseek-ai/DeepSeek-V3");
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let factory = ProviderModelFactory::new();
        let result = factory
            .create_siliconflow_model(&DelveConfig::default(), 0.7)
            .await;

        match result {
            Err(DelveError::Config { message, .. }) => {
                assert!(message.contains("SILICONFLOW_API_KEY"))
            }
            Err(other) => panic!("Expected Config error, got {}", other),
            Ok(_) => panic!("Expected an error without an API key"),
        }

        assert!(factory.searcher(&DelveConfig::default()).is_err());
    }
}
