//! Integration test helpers
//!
//! A canned model factory, app state built on it, and a server spawned on a
//! random port.

#![allow(dead_code)]

use async_trait::async_trait;
use delve_core::{llm_error, DelveConfig, DelveResult, Message, Provider};
use delve_llm::{
    Candidate, ChatModel, Content, GroundedResponse, GroundedSearch, GroundingChunk,
    GroundingMetadata, GroundingSupport, ModelFactory, ModelRequest, Part, Segment, WebSource,
};
use delve_web::{AppState, DelveServer, WebConfig};
use std::sync::{Arc, LazyLock};
use tokio::net::TcpListener;

// Initialise tracing once for all tests
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

pub const SHORT_URL: &str = "https://vertexaisearch.cloud.google.com/id/0-0";

/// Replies by prompt shape instead of calling a provider
///
/// Merge prompts get `merged answer`, JSON prompts get a small valid object,
/// answers cite the first source, anything else echoes the provider.
pub struct CannedModel {
    provider: Provider,
    model: String,
    fail_gemini: bool,
}

#[async_trait]
impl ChatModel for CannedModel {
    async fn generate(&self, messages: &[Message]) -> DelveResult<String> {
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or_default();

        if self.fail_gemini && self.provider == Provider::Gemini {
            return Err(llm_error!("gemini unavailable", self.provider, self.model, "test"));
        }
        if prompt.starts_with("You are an expert at synthesizing answers") {
            return Ok("merged answer".to_string());
        }
        if prompt.contains("\"query\"") {
            return Ok(r#"{"rationale": "r", "query": ["rust editions"]}"#.to_string());
        }
        if prompt.contains("\"is_sufficient\"") {
            return Ok(r#"{"is_sufficient": true, "knowledge_gap": "", "follow_up_queries": []}"#.to_string());
        }
        if prompt.contains("high-quality answer") {
            return Ok(format!("Editions ship every three years [rust]({}).", SHORT_URL));
        }
        Ok(format!("{} reply", self.provider))
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }
}

pub struct CannedSearch;

#[async_trait]
impl GroundedSearch for CannedSearch {
    async fn search(&self, _model: &str, _prompt: &str) -> DelveResult<GroundedResponse> {
        let text = "Rust editions arrive every three years.".to_string();
        let end = text.len();
        Ok(GroundedResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: vec![Part { text: Some(text) }],
                    role: None,
                }),
                grounding_metadata: Some(GroundingMetadata {
                    grounding_chunks: vec![GroundingChunk {
                        web: Some(WebSource {
                            uri: Some("https://doc.rust-lang.org/edition-guide".to_string()),
                            title: Some("rust-lang.org".to_string()),
                        }),
                    }],
                    grounding_supports: vec![GroundingSupport {
                        segment: Some(Segment {
                            start_index: Some(0),
                            end_index: Some(end),
                            text: None,
                        }),
                        grounding_chunk_indices: vec![0],
                    }],
                    web_search_queries: vec![],
                }),
                finish_reason: None,
            }],
        })
    }
}

#[derive(Default)]
pub struct CannedFactory {
    pub fail_gemini: bool,
}

#[async_trait]
impl ModelFactory for CannedFactory {
    async fn create(
        &self,
        config: &DelveConfig,
        request: ModelRequest,
    ) -> DelveResult<Arc<dyn ChatModel>> {
        let resolved = request.resolve(config);
        config.require_key(resolved.provider)?;
        Ok(Arc::new(CannedModel {
            provider: resolved.provider,
            model: resolved.model,
            fail_gemini: self.fail_gemini,
        }))
    }

    fn searcher(&self, config: &DelveConfig) -> DelveResult<Arc<dyn GroundedSearch>> {
        config.require_key(Provider::Gemini)?;
        Ok(Arc::new(CannedSearch))
    }
}

pub fn keyed_config() -> DelveConfig {
    let mut config = DelveConfig::default();
    config.api.gemini_api_key = Some("test-gemini".to_string());
    config.api.siliconflow_api_key = Some("test-siliconflow".to_string());
    config
}

pub fn test_state(config: DelveConfig, factory: CannedFactory) -> AppState {
    LazyLock::force(&TRACING);
    AppState::with_factory(WebConfig::default(), config, Arc::new(factory))
}

/// Running server instance
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn get_health(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/api/health", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_json<Body>(&self, path: &str, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

/// Spawn the app on a random port
pub async fn spawn_app(state: AppState) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(DelveServer::with_state(state).serve(listener));

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        api_client: reqwest::Client::new(),
    }
}
