//! Configuration management
//!
//! Resolves which provider and model serve each pipeline stage. Values come
//! from defaults, then the environment (or a TOML file), then per-call
//! overrides.

use crate::error::{DelveError, DelveResult, ErrorContext};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_SILICONFLOW_BASE_URL: &str = "https://api.siliconflow.cn/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A named point in a pipeline where a provider/model choice is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    QueryGenerator,
    Reflection,
    Answer,
    Chat,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::QueryGenerator,
        Stage::Reflection,
        Stage::Answer,
        Stage::Chat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::QueryGenerator => "query_generator",
            Stage::Reflection => "reflection",
            Stage::Answer => "answer",
            Stage::Chat => "chat",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = DelveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DelveError::Validation {
                message: format!("Unknown stage: {}", s),
                field: Some("stage".to_string()),
                context: ErrorContext::new("config")
                    .with_suggestion("Use one of: query_generator, reflection, answer, chat"),
            })
    }
}

/// Remote model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    SiliconFlow,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::SiliconFlow => "siliconflow",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::SiliconFlow => "SILICONFLOW_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = DelveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "siliconflow" => Ok(Provider::SiliconFlow),
            other => Err(DelveError::Config {
                message: format!("Unsupported model provider: {}", other),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("parse_provider")
                    .with_suggestion("Supported providers are 'gemini' and 'siliconflow'"),
            }),
        }
    }
}

/// Provider and model names for every stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    /// Provider used by any stage without its own provider
    pub model_provider: Provider,
    pub query_generator_provider: Option<Provider>,
    pub reflection_provider: Option<Provider>,
    pub answer_provider: Option<Provider>,
    pub chat_provider: Option<Provider>,

    // Gemini model names
    pub query_generator_model: String,
    pub reflection_model: String,
    pub answer_model: String,
    pub chat_model: String,

    // SiliconFlow model names
    pub siliconflow_query_model: String,
    pub siliconflow_reflection_model: String,
    pub siliconflow_answer_model: String,
    pub siliconflow_chat_model: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_provider: Provider::Gemini,
            query_generator_provider: None,
            reflection_provider: None,
            answer_provider: None,
            chat_provider: None,
            query_generator_model: "gemini-2.0-flash".to_string(),
            reflection_model: "gemini-2.5-flash".to_string(),
            answer_model: "gemini-2.5-pro".to_string(),
            chat_model: "gemini-2.0-flash".to_string(),
            siliconflow_query_model: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            siliconflow_reflection_model: "Qwen/Qwen2.5-14B-Instruct".to_string(),
            siliconflow_answer_model: "Qwen/Qwen2.5-72B-Instruct".to_string(),
            siliconflow_chat_model: "Qwen/Qwen2.5-7B-Instruct".to_string(),
        }
    }
}

/// Provider/model pair resolved for one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageModel {
    pub stage: Stage,
    pub provider: Provider,
    pub model: String,
}

impl ModelSettings {
    /// Stage-specific provider, falling back to `model_provider`
    pub fn stage_provider(&self, stage: Stage) -> Provider {
        let specific = match stage {
            Stage::QueryGenerator => self.query_generator_provider,
            Stage::Reflection => self.reflection_provider,
            Stage::Answer => self.answer_provider,
            Stage::Chat => self.chat_provider,
        };
        specific.unwrap_or(self.model_provider)
    }

    /// Model name configured for `stage` under `provider`
    pub fn model_for(&self, stage: Stage, provider: Provider) -> &str {
        match (provider, stage) {
            (Provider::Gemini, Stage::QueryGenerator) => &self.query_generator_model,
            (Provider::Gemini, Stage::Reflection) => &self.reflection_model,
            (Provider::Gemini, Stage::Answer) => &self.answer_model,
            (Provider::Gemini, Stage::Chat) => &self.chat_model,
            (Provider::SiliconFlow, Stage::QueryGenerator) => &self.siliconflow_query_model,
            (Provider::SiliconFlow, Stage::Reflection) => &self.siliconflow_reflection_model,
            (Provider::SiliconFlow, Stage::Answer) => &self.siliconflow_answer_model,
            (Provider::SiliconFlow, Stage::Chat) => &self.siliconflow_chat_model,
        }
    }

    fn model_slot(&mut self, stage: Stage, provider: Provider) -> &mut String {
        match (provider, stage) {
            (Provider::Gemini, Stage::QueryGenerator) => &mut self.query_generator_model,
            (Provider::Gemini, Stage::Reflection) => &mut self.reflection_model,
            (Provider::Gemini, Stage::Answer) => &mut self.answer_model,
            (Provider::Gemini, Stage::Chat) => &mut self.chat_model,
            (Provider::SiliconFlow, Stage::QueryGenerator) => &mut self.siliconflow_query_model,
            (Provider::SiliconFlow, Stage::Reflection) => &mut self.siliconflow_reflection_model,
            (Provider::SiliconFlow, Stage::Answer) => &mut self.siliconflow_answer_model,
            (Provider::SiliconFlow, Stage::Chat) => &mut self.siliconflow_chat_model,
        }
    }

    /// Resolve the provider and model serving `stage`
    pub fn resolve(&self, stage: Stage) -> StageModel {
        let provider = self.stage_provider(stage);
        StageModel {
            stage,
            provider,
            model: self.model_for(stage, provider).to_string(),
        }
    }
}

/// Research loop limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResearchSettings {
    pub number_of_initial_queries: usize,
    pub max_research_loops: usize,
    pub max_concurrent_searches: usize,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            number_of_initial_queries: 5,
            max_research_loops: 3,
            max_concurrent_searches: 8,
        }
    }
}

/// Provider credentials and endpoints
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiKeys {
    pub gemini_api_key: Option<String>,
    pub siliconflow_api_key: Option<String>,
    pub gemini_base_url: String,
    pub siliconflow_base_url: String,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            siliconflow_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            siliconflow_base_url: DEFAULT_SILICONFLOW_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .field(
                "siliconflow_api_key",
                &self.siliconflow_api_key.as_ref().map(|_| "***"),
            )
            .field("gemini_base_url", &self.gemini_base_url)
            .field("siliconflow_base_url", &self.siliconflow_base_url)
            .finish()
    }
}

impl ApiKeys {
    /// Non-empty key for `provider`
    pub fn key_for(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::Gemini => self.gemini_api_key.as_deref(),
            Provider::SiliconFlow => self.siliconflow_api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }

    pub fn base_url_for(&self, provider: Provider) -> &str {
        match provider {
            Provider::Gemini => &self.gemini_base_url,
            Provider::SiliconFlow => &self.siliconflow_base_url,
        }
    }
}

/// Client-side call limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    /// Retries after the first attempt of a model call
    pub max_retries: usize,
    pub request_timeout_secs: u64,
    /// Bound on each branch of a dual-model chat
    pub dual_branch_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            request_timeout_secs: 120,
            dual_branch_timeout_secs: 120,
        }
    }
}

/// Per-call overrides; every field left `None` keeps the configured value
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigOverrides {
    pub model_provider: Option<Provider>,
    pub query_generator_provider: Option<Provider>,
    pub reflection_provider: Option<Provider>,
    pub answer_provider: Option<Provider>,
    pub chat_provider: Option<Provider>,
    pub query_generator_model: Option<String>,
    pub reflection_model: Option<String>,
    pub answer_model: Option<String>,
    pub chat_model: Option<String>,
    pub siliconflow_query_model: Option<String>,
    pub siliconflow_reflection_model: Option<String>,
    pub siliconflow_answer_model: Option<String>,
    pub siliconflow_chat_model: Option<String>,
    pub initial_search_query_count: Option<usize>,
    pub max_research_loops: Option<usize>,
    /// Replaces the reflection and answer models for whichever provider serves them
    pub reasoning_model: Option<String>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self == &ConfigOverrides::default()
    }
}

/// Introspection record for one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub stage: Stage,
    pub provider: Provider,
    pub model_name: String,
    pub api_key_set: bool,
}

/// Complete Delve configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DelveConfig {
    pub models: ModelSettings,
    pub research: ResearchSettings,
    pub api: ApiKeys,
    pub llm: LlmSettings,
}

impl DelveConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> DelveResult<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_env_with<F>(lookup: F) -> DelveResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env(&lookup)?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: &F) -> DelveResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get("MODEL_PROVIDER") {
            self.models.model_provider = value.parse()?;
        }

        let stage_providers = [
            ("QUERY_GENERATOR_PROVIDER", &mut self.models.query_generator_provider),
            ("REFLECTION_PROVIDER", &mut self.models.reflection_provider),
            ("ANSWER_PROVIDER", &mut self.models.answer_provider),
            ("CHAT_PROVIDER", &mut self.models.chat_provider),
        ];
        for (key, slot) in stage_providers {
            if let Some(value) = get(key) {
                *slot = Some(value.parse()?);
            }
        }

        let string_fields = [
            ("QUERY_GENERATOR_MODEL", &mut self.models.query_generator_model),
            ("REFLECTION_MODEL", &mut self.models.reflection_model),
            ("ANSWER_MODEL", &mut self.models.answer_model),
            ("CHAT_MODEL", &mut self.models.chat_model),
            ("SILICONFLOW_QUERY_MODEL", &mut self.models.siliconflow_query_model),
            (
                "SILICONFLOW_REFLECTION_MODEL",
                &mut self.models.siliconflow_reflection_model,
            ),
            ("SILICONFLOW_ANSWER_MODEL", &mut self.models.siliconflow_answer_model),
            ("SILICONFLOW_CHAT_MODEL", &mut self.models.siliconflow_chat_model),
            ("GEMINI_BASE_URL", &mut self.api.gemini_base_url),
            ("SILICONFLOW_BASE_URL", &mut self.api.siliconflow_base_url),
        ];
        for (key, slot) in string_fields {
            if let Some(value) = get(key) {
                *slot = value;
            }
        }

        if let Some(value) = get("GEMINI_API_KEY") {
            self.api.gemini_api_key = Some(value);
        }
        if let Some(value) = get("SILICONFLOW_API_KEY") {
            self.api.siliconflow_api_key = Some(value);
        }

        let counts = [
            (
                "NUMBER_OF_INITIAL_QUERIES",
                &mut self.research.number_of_initial_queries,
            ),
            ("MAX_RESEARCH_LOOPS", &mut self.research.max_research_loops),
            (
                "MAX_CONCURRENT_SEARCHES",
                &mut self.research.max_concurrent_searches,
            ),
            ("LLM_MAX_RETRIES", &mut self.llm.max_retries),
        ];
        for (key, slot) in counts {
            if let Some(value) = get(key) {
                *slot = parse_number(key, &value)?;
            }
        }

        let timeouts = [
            ("LLM_REQUEST_TIMEOUT_SECS", &mut self.llm.request_timeout_secs),
            (
                "DUAL_BRANCH_TIMEOUT_SECS",
                &mut self.llm.dual_branch_timeout_secs,
            ),
        ];
        for (key, slot) in timeouts {
            if let Some(value) = get(key) {
                *slot = parse_number(key, &value)?;
            }
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> DelveResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DelveError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: DelveConfig = toml::from_str(&content).map_err(|e| DelveError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Fill API keys missing from a file-based config with environment values
    pub fn with_env_keys(mut self) -> Self {
        if self.api.key_for(Provider::Gemini).is_none() {
            self.api.gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        }
        if self.api.key_for(Provider::SiliconFlow).is_none() {
            self.api.siliconflow_api_key = std::env::var("SILICONFLOW_API_KEY").ok();
        }
        self
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> DelveResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| DelveError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| DelveError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate limits and model names
    pub fn validate(&self) -> DelveResult<()> {
        if self.research.number_of_initial_queries == 0 {
            return Err(invalid(
                "research.number_of_initial_queries must be greater than 0",
                "Set NUMBER_OF_INITIAL_QUERIES to a positive value",
            ));
        }

        if self.research.max_concurrent_searches == 0 {
            return Err(invalid(
                "research.max_concurrent_searches must be greater than 0",
                "Set MAX_CONCURRENT_SEARCHES to a positive value",
            ));
        }

        for stage in Stage::ALL {
            for provider in [Provider::Gemini, Provider::SiliconFlow] {
                if self.models.model_for(stage, provider).trim().is_empty() {
                    return Err(invalid(
                        &format!("No {} model configured for stage {}", provider, stage),
                        "Set the model name for every stage",
                    ));
                }
            }
        }

        Ok(())
    }

    /// A copy of this configuration with per-call overrides applied
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Self {
        let mut config = self.clone();
        let models = &mut config.models;

        if let Some(provider) = overrides.model_provider {
            models.model_provider = provider;
        }
        let providers = [
            (overrides.query_generator_provider, &mut models.query_generator_provider),
            (overrides.reflection_provider, &mut models.reflection_provider),
            (overrides.answer_provider, &mut models.answer_provider),
            (overrides.chat_provider, &mut models.chat_provider),
        ];
        for (value, slot) in providers {
            if value.is_some() {
                *slot = value;
            }
        }

        let names = [
            (&overrides.query_generator_model, &mut models.query_generator_model),
            (&overrides.reflection_model, &mut models.reflection_model),
            (&overrides.answer_model, &mut models.answer_model),
            (&overrides.chat_model, &mut models.chat_model),
            (&overrides.siliconflow_query_model, &mut models.siliconflow_query_model),
            (
                &overrides.siliconflow_reflection_model,
                &mut models.siliconflow_reflection_model,
            ),
            (&overrides.siliconflow_answer_model, &mut models.siliconflow_answer_model),
            (&overrides.siliconflow_chat_model, &mut models.siliconflow_chat_model),
        ];
        for (value, slot) in names {
            if let Some(name) = value {
                *slot = name.clone();
            }
        }

        if let Some(reasoning) = &overrides.reasoning_model {
            for stage in [Stage::Reflection, Stage::Answer] {
                let provider = models.stage_provider(stage);
                *models.model_slot(stage, provider) = reasoning.clone();
            }
        }

        if let Some(count) = overrides.initial_search_query_count {
            config.research.number_of_initial_queries = count;
        }
        if let Some(loops) = overrides.max_research_loops {
            config.research.max_research_loops = loops;
        }

        config
    }

    /// Providers referenced by at least one stage, in stage order
    pub fn providers_in_use(&self) -> Vec<Provider> {
        let mut providers = Vec::new();
        for stage in Stage::ALL {
            let provider = self.models.stage_provider(stage);
            if !providers.contains(&provider) {
                providers.push(provider);
            }
        }
        providers
    }

    /// Environment variable names of keys missing for providers in use
    pub fn missing_keys(&self) -> Vec<&'static str> {
        self.providers_in_use()
            .into_iter()
            .filter(|p| self.api.key_for(*p).is_none())
            .map(|p| p.api_key_env())
            .collect()
    }

    /// Fail when any provider in use has no API key
    pub fn validate_keys(&self) -> DelveResult<()> {
        let missing = self.missing_keys();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(crate::config_error!(
                format!("Missing API keys: {}", missing.join(", ")),
                "config"
            ))
        }
    }

    /// API key for `provider`, or a configuration error naming the variable
    pub fn require_key(&self, provider: Provider) -> DelveResult<String> {
        self.api
            .key_for(provider)
            .map(str::to_string)
            .ok_or_else(|| {
                crate::config_error!(
                    format!("{} environment variable is not set", provider.api_key_env()),
                    "config"
                )
            })
    }

    pub fn model_info(&self, stage: Stage) -> ModelInfo {
        let resolved = self.models.resolve(stage);
        ModelInfo {
            stage,
            provider: resolved.provider,
            api_key_set: self.api.key_for(resolved.provider).is_some(),
            model_name: resolved.model,
        }
    }

    pub fn all_model_info(&self) -> Vec<ModelInfo> {
        Stage::ALL.into_iter().map(|s| self.model_info(s)).collect()
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> DelveResult<T> {
    value.trim().parse().map_err(|_| DelveError::Config {
        message: format!("{} must be a non-negative integer, got '{}'", key, value),
        source: None,
        context: ErrorContext::new("config")
            .with_operation("parse_env")
            .with_metadata("variable", key),
    })
}

fn invalid(message: &str, suggestion: &str) -> DelveError {
    DelveError::Config {
        message: message.to_string(),
        source: None,
        context: ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion(suggestion),
    }
}
