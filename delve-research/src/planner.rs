//! Query generation and reflection
//!
//! Both steps ask a model for a small JSON object and fall back to a safe
//! default when the reply is unusable, so a flaky model never aborts a run.

use crate::prompts::{
    create_query_writer_prompt, create_reflection_prompt, current_date, QUERY_WRITER_FORMAT,
    REFLECTION_FORMAT,
};
use crate::types::{ResearchStage, ResearchState, ReflectionVerdict, SearchQueryList};
use delve_core::{DelveConfig, DelveResult, Stage};
use delve_llm::{generate_json, ModelFactory, ModelRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};

const QUERY_TEMPERATURE: f32 = 1.0;
const REFLECTION_TEMPERATURE: f32 = 1.0;

/// Plans the searches a research run performs
pub struct QueryPlanner {
    factory: Arc<dyn ModelFactory>,
}

impl QueryPlanner {
    pub fn new(factory: Arc<dyn ModelFactory>) -> Self {
        Self { factory }
    }

    /// Initial search queries for `topic`
    ///
    /// Always returns between one and `count` queries (at least one even when
    /// `count` is zero); the topic itself is the fallback.
    pub async fn plan_initial_queries(
        &self,
        config: &DelveConfig,
        topic: &str,
        count: usize,
    ) -> Vec<String> {
        match self.generate_queries(config, topic, count).await {
            Ok(list) => {
                let mut queries: Vec<String> = list
                    .query
                    .into_iter()
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty())
                    .collect();
                queries.truncate(count.max(1));

                if queries.is_empty() {
                    warn!("Query generation returned no queries, searching the topic directly");
                    return vec![topic.to_string()];
                }

                info!(count = queries.len(), rationale = %list.rationale, "Generated search queries");
                queries
            }
            Err(e) => {
                warn!(error = %e, "Query generation failed, searching the topic directly");
                vec![topic.to_string()]
            }
        }
    }

    async fn generate_queries(
        &self,
        config: &DelveConfig,
        topic: &str,
        count: usize,
    ) -> DelveResult<SearchQueryList> {
        let model = self
            .factory
            .create(config, ModelRequest::new(Stage::QueryGenerator, QUERY_TEMPERATURE))
            .await?;

        let prompt = create_query_writer_prompt(topic, count, &current_date());
        generate_json(model.as_ref(), &prompt, QUERY_WRITER_FORMAT).await
    }

    /// Judge whether the gathered summaries answer the topic
    ///
    /// Increments the loop counter before anything else. A failed call is
    /// treated as sufficient so the run moves on to finalization.
    pub async fn reflect(&self, config: &DelveConfig, state: &mut ResearchState) -> ReflectionVerdict {
        state.research_loop_count += 1;
        state.stage = ResearchStage::Reflection;

        let topic = state.research_topic();
        match self.generate_verdict(config, &topic, &state.web_research_results).await {
            Ok(verdict) => {
                debug!(
                    loop_count = state.research_loop_count,
                    is_sufficient = verdict.is_sufficient,
                    follow_ups = verdict.follow_up_queries.len(),
                    "Reflection complete"
                );
                verdict
            }
            Err(e) => {
                warn!(error = %e, "Reflection failed, treating research as sufficient");
                ReflectionVerdict {
                    is_sufficient: true,
                    knowledge_gap: String::new(),
                    follow_up_queries: Vec::new(),
                }
            }
        }
    }

    async fn generate_verdict(
        &self,
        config: &DelveConfig,
        topic: &str,
        summaries: &[String],
    ) -> DelveResult<ReflectionVerdict> {
        let model = self
            .factory
            .create(config, ModelRequest::new(Stage::Reflection, REFLECTION_TEMPERATURE))
            .await?;

        let prompt = create_reflection_prompt(topic, summaries, &current_date());
        generate_json(model.as_ref(), &prompt, REFLECTION_FORMAT).await
    }
}
