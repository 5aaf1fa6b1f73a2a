//! Research pipeline data types

use delve_core::{research_topic, DelveConfig, Message};
use serde::{Deserialize, Serialize};

/// One web source a research result cites
///
/// `short_url` is the compact token spliced into model text; `value` is the
/// original URL it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SourceRecord {
    #[cfg_attr(feature = "openapi", schema(example = "wikipedia"))]
    pub label: String,
    #[cfg_attr(
        feature = "openapi",
        schema(example = "https://vertexaisearch.cloud.google.com/id/0-1")
    )]
    pub short_url: String,
    #[cfg_attr(feature = "openapi", schema(example = "https://en.wikipedia.org/wiki/Rust"))]
    pub value: String,
}

/// Sources to splice in just before `end_index` (a byte offset into the raw text)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationAnnotation {
    pub start_index: usize,
    pub end_index: usize,
    pub segments: Vec<SourceRecord>,
}

/// One grounded search to run; `id` is unique within a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchTask {
    pub search_query: String,
    pub id: usize,
}

/// What one web research branch contributes to the run
#[derive(Debug, Clone, PartialEq)]
pub struct WebResearchOutput {
    pub sources_gathered: Vec<SourceRecord>,
    pub search_query: String,
    /// Model text with citation markers spliced in
    pub web_research_result: String,
}

/// Structured reply of the query generation step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQueryList {
    pub query: Vec<String>,
    pub rationale: String,
}

/// Structured reply of the reflection step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionVerdict {
    pub is_sufficient: bool,
    pub knowledge_gap: String,
    pub follow_up_queries: Vec<String>,
}

/// Outcome of the loop-termination decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    Finalize,
    Research(Vec<WebSearchTask>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ResearchStage {
    QueryGeneration,
    WebResearch,
    Reflection,
    Finalized,
}

/// Mutable state of one research run
#[derive(Debug, Clone)]
pub struct ResearchState {
    pub messages: Vec<Message>,
    pub search_queries: Vec<String>,
    pub web_research_results: Vec<String>,
    pub sources_gathered: Vec<SourceRecord>,
    pub research_loop_count: usize,
    pub initial_search_query_count: usize,
    pub max_research_loops: usize,
    pub stage: ResearchStage,
}

impl ResearchState {
    /// Fresh state with limits taken from an already-overridden config
    pub fn new(messages: Vec<Message>, config: &DelveConfig) -> Self {
        Self {
            messages,
            search_queries: Vec::new(),
            web_research_results: Vec::new(),
            sources_gathered: Vec::new(),
            research_loop_count: 0,
            initial_search_query_count: config.research.number_of_initial_queries,
            max_research_loops: config.research.max_research_loops,
            stage: ResearchStage::QueryGeneration,
        }
    }

    pub fn research_topic(&self) -> String {
        research_topic(&self.messages)
    }

    /// Append one branch's output
    pub fn absorb(&mut self, output: WebResearchOutput) {
        self.search_queries.push(output.search_query);
        self.web_research_results.push(output.web_research_result);
        self.sources_gathered.extend(output.sources_gathered);
    }
}

/// Final result of a research run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResearchOutcome {
    pub answer: String,
    /// Sources actually cited in `answer`, once each, in gathering order
    pub sources: Vec<SourceRecord>,
    pub search_queries: Vec<String>,
    pub research_loop_count: usize,
    pub stage: ResearchStage,
    pub success: bool,
    pub error_message: Option<String>,
}

impl ResearchOutcome {
    /// Outcome for a run that stopped before producing an answer
    pub fn failed(state: &ResearchState, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            answer: message.clone(),
            sources: Vec::new(),
            search_queries: state.search_queries.clone(),
            research_loop_count: state.research_loop_count,
            stage: state.stage,
            success: false,
            error_message: Some(message),
        }
    }
}
