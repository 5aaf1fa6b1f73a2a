//! Scripted model and search doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use delve_core::{llm_error, DelveConfig, DelveResult, Message, Provider, Stage};
use delve_llm::{
    Candidate, ChatModel, Content, GroundedResponse, GroundedSearch, GroundingChunk,
    GroundingMetadata, GroundingSupport, ModelFactory, ModelRequest, Part, Segment, WebSource,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted model sees for one call
#[derive(Debug, Clone)]
pub struct Call {
    pub stage: Stage,
    pub provider: Provider,
    pub model: String,
    pub temperature: f32,
    pub prompt: String,
    pub message_count: usize,
}

type Responder = dyn Fn(&Call) -> DelveResult<String> + Send + Sync;

pub struct ScriptedModel {
    stage: Stage,
    provider: Provider,
    model: String,
    temperature: f32,
    responder: Arc<Responder>,
    calls: Arc<Mutex<Vec<Call>>>,
    stall: Option<Duration>,
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(&self, messages: &[Message]) -> DelveResult<String> {
        let call = Call {
            stage: self.stage,
            provider: self.provider,
            model: self.model.clone(),
            temperature: self.temperature,
            prompt: messages.last().map(|m| m.content.clone()).unwrap_or_default(),
            message_count: messages.len(),
        };
        self.calls.lock().unwrap().push(call.clone());
        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&call)
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Grounded search double: one cited sentence per query
///
/// Each response cites `https://<slug>.example.org/page` and
/// `https://shared.example.org/common`, where `<slug>` is derived from the
/// query. Queries containing `FAIL` return an error.
#[derive(Default)]
pub struct ScriptedSearch {
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn slug(query: &str) -> String {
        query
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase()
    }
}

#[async_trait]
impl GroundedSearch for ScriptedSearch {
    async fn search(&self, _model: &str, prompt: &str) -> DelveResult<GroundedResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if prompt.contains("FAIL") {
            return Err(llm_error!("search backend unavailable", "gemini", "mock", "test"));
        }

        let query = prompt
            .split('"')
            .nth(1)
            .unwrap_or("unknown")
            .to_string();
        let text = format!("Findings about {}.", query);
        let end = text.len();

        Ok(GroundedResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: vec![Part { text: Some(text) }],
                    role: Some("model".to_string()),
                }),
                grounding_metadata: Some(GroundingMetadata {
                    grounding_chunks: vec![
                        GroundingChunk {
                            web: Some(WebSource {
                                uri: Some(format!("https://{}.example.org/page", Self::slug(&query))),
                                title: Some(format!("{}.org", Self::slug(&query))),
                            }),
                        },
                        GroundingChunk {
                            web: Some(WebSource {
                                uri: Some("https://shared.example.org/common".to_string()),
                                title: Some("shared.org".to_string()),
                            }),
                        },
                    ],
                    grounding_supports: vec![GroundingSupport {
                        segment: Some(Segment {
                            start_index: Some(0),
                            end_index: Some(end),
                            text: None,
                        }),
                        grounding_chunk_indices: vec![0, 1],
                    }],
                    web_search_queries: vec![query],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
        })
    }
}

/// Factory handing out [`ScriptedModel`]s that share one responder
pub struct ScriptedFactory {
    responder: Arc<Responder>,
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub search: Option<Arc<ScriptedSearch>>,
    stall: Option<(Provider, Duration)>,
}

impl ScriptedFactory {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Call) -> DelveResult<String> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
            search: Some(Arc::new(ScriptedSearch::default())),
            stall: None,
        }
    }

    /// Models for `provider` sleep for `delay` before answering
    pub fn with_stall(mut self, provider: Provider, delay: Duration) -> Self {
        self.stall = Some((provider, delay));
        self
    }

    pub fn without_search(mut self) -> Self {
        self.search = None;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, stage: Stage) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.stage == stage).collect()
    }
}

#[async_trait]
impl ModelFactory for ScriptedFactory {
    async fn create(
        &self,
        config: &DelveConfig,
        request: ModelRequest,
    ) -> DelveResult<Arc<dyn ChatModel>> {
        let resolved = request.resolve(config);
        Ok(Arc::new(ScriptedModel {
            stage: resolved.stage,
            provider: resolved.provider,
            model: resolved.model,
            temperature: request.temperature,
            responder: Arc::clone(&self.responder),
            calls: Arc::clone(&self.calls),
            stall: self
                .stall
                .filter(|(provider, _)| *provider == resolved.provider)
                .map(|(_, delay)| delay),
        }))
    }

    fn searcher(&self, config: &DelveConfig) -> DelveResult<Arc<dyn GroundedSearch>> {
        config.require_key(Provider::Gemini)?;
        match &self.search {
            Some(search) => Ok(Arc::clone(search) as Arc<dyn GroundedSearch>),
            None => Err(delve_core::config_error!("search disabled", "test")),
        }
    }
}

/// Config with both keys set and small research limits
pub fn test_config() -> DelveConfig {
    let mut config = DelveConfig::default();
    config.api.gemini_api_key = Some("test-gemini-key".to_string());
    config.api.siliconflow_api_key = Some("test-siliconflow-key".to_string());
    config.research.number_of_initial_queries = 2;
    config.research.max_research_loops = 2;
    config.llm.dual_branch_timeout_secs = 5;
    config
}
