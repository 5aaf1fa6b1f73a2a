//! Google Search grounded generation
//!
//! The chat abstraction in siumai does not surface grounding metadata, so
//! this talks to the Gemini `generateContent` endpoint directly.

use async_trait::async_trait;
use delve_core::{retry_async_when, DelveError, DelveResult, ErrorContext, RetryConfig};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Model output together with the evidence linking it to web pages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundedResponse {
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
    pub content: Option<Content>,
    pub grounding_metadata: Option<GroundingMetadata>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Content {
    pub parts: Vec<Part>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Part {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundingMetadata {
    pub grounding_chunks: Vec<GroundingChunk>,
    pub grounding_supports: Vec<GroundingSupport>,
    pub web_search_queries: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundingChunk {
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebSource {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundingSupport {
    pub segment: Option<Segment>,
    pub grounding_chunk_indices: Vec<usize>,
}

/// Byte range of the generated text backed by a support
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Segment {
    pub start_index: Option<usize>,
    pub end_index: Option<usize>,
    pub text: Option<String>,
}

impl GroundedResponse {
    /// Concatenated text parts of the first candidate
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Grounding metadata of the first candidate
    pub fn grounding(&self) -> Option<&GroundingMetadata> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
    }
}

/// Generation with the Google Search tool enabled
#[async_trait]
pub trait GroundedSearch: Send + Sync {
    async fn search(&self, model: &str, prompt: &str) -> DelveResult<GroundedResponse>;
}

/// REST client for grounded Gemini generation
#[derive(Debug, Clone)]
pub struct GeminiSearchClient {
    http: reqwest::Client,
    api_key: String,
    base_url: Url,
    max_retries: usize,
    retry_delay_ms: u64,
    timeout_ms: u64,
}

impl GeminiSearchClient {
    pub fn new(http: reqwest::Client, api_key: String, base_url: &str) -> DelveResult<Self> {
        // A trailing slash keeps the version segment when joining
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| DelveError::Config {
            message: format!("Invalid Gemini base URL '{}': {}", base_url, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("gemini_search")
                .with_operation("new")
                .with_suggestion("Check GEMINI_BASE_URL"),
        })?;

        Ok(Self {
            http,
            api_key,
            base_url,
            max_retries: 2,
            retry_delay_ms: 1000,
            timeout_ms: 120_000,
        })
    }

    pub fn with_limits(mut self, max_retries: usize, timeout_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.timeout_ms = timeout_ms;
        self
    }

    /// Pause between attempts after a recoverable failure
    pub fn with_retry_delay(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// `{base}/models/{model}:generateContent`
    pub fn endpoint(&self, model: &str) -> DelveResult<Url> {
        self.base_url
            .join(&format!("models/{}:generateContent", model))
            .map_err(|e| DelveError::Config {
                message: format!("Invalid model name '{}': {}", model, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("gemini_search").with_operation("endpoint"),
            })
    }

    pub fn request_body(prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "tools": [{ "google_search": {} }],
            "generationConfig": { "temperature": 0 },
        })
    }
}

async fn send_request(
    http: reqwest::Client,
    url: Url,
    api_key: String,
    body: serde_json::Value,
    timeout_ms: u64,
) -> DelveResult<GroundedResponse> {
    let response = http
        .post(url)
        .header("x-goog-api-key", api_key)
        .timeout(Duration::from_millis(timeout_ms))
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                DelveError::Timeout {
                    operation: "gemini_grounded_search".to_string(),
                    duration_ms: timeout_ms,
                    context: ErrorContext::new("gemini_search").with_operation("send"),
                }
            } else {
                DelveError::Network {
                    message: format!("Failed to reach Gemini API: {}", e),
                    source: Some(Box::new(e)),
                    context: ErrorContext::new("gemini_search").with_operation("send"),
                }
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        let message = format!(
            "HTTP {} from Gemini API: {}",
            status.as_u16(),
            if error_body.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error")
            } else {
                &error_body
            }
        );
        let context = ErrorContext::new("gemini_search")
            .with_operation("generate_content")
            .with_suggestion(match status.as_u16() {
                400 => "Check the model name and request payload",
                401 | 403 => "Check GEMINI_API_KEY",
                429 => "Reduce MAX_CONCURRENT_SEARCHES or wait before retrying",
                _ => "Check network connectivity and API status",
            });

        return Err(match status.as_u16() {
            429 => DelveError::RateLimit {
                message,
                retry_after_ms: None,
                context,
            },
            code if code >= 500 => DelveError::Network {
                message,
                source: None,
                context,
            },
            _ => DelveError::Llm {
                message,
                provider: Some("gemini".to_string()),
                model: None,
                context,
            },
        });
    }

    let bytes = response.bytes().await.map_err(|e| DelveError::Network {
        message: format!("Failed to read Gemini response: {}", e),
        source: Some(Box::new(e)),
        context: ErrorContext::new("gemini_search").with_operation("read_body"),
    })?;

    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl GroundedSearch for GeminiSearchClient {
    async fn search(&self, model: &str, prompt: &str) -> DelveResult<GroundedResponse> {
        let url = self.endpoint(model)?;
        let body = Self::request_body(prompt);
        debug!(model = model, "Running grounded search");

        let http = self.http.clone();
        let api_key = self.api_key.clone();
        let timeout_ms = self.timeout_ms;
        let operation = move || {
            send_request(
                http.clone(),
                url.clone(),
                api_key.clone(),
                body.clone(),
                timeout_ms,
            )
            .boxed()
        };

        let response = retry_async_when(
            operation,
            RetryConfig::fixed(self.max_retries, self.retry_delay_ms),
            "gemini_grounded_search",
            DelveError::is_recoverable,
        )
        .await?;

        info!(
            model = model,
            sources = response
                .grounding()
                .map(|g| g.grounding_chunks.len())
                .unwrap_or(0),
            "Grounded search completed"
        );

        Ok(response)
    }
}
