//! Grounded web research branches
//!
//! Each task runs one Google Search grounded generation; the reply text gets
//! citation markers with short URLs and the cited sources are collected.

use crate::citations::{get_citations, insert_citation_markers, resolve_urls};
use crate::prompts::{create_web_searcher_prompt, current_date};
use crate::types::{WebResearchOutput, WebSearchTask};
use delve_core::{process_concurrently, DelveConfig, DelveResult, Provider, Stage};
use delve_llm::GroundedSearch;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct WebSearcher;

impl WebSearcher {
    pub fn new() -> Self {
        Self
    }

    /// Run one task; a failed search becomes a note with no sources
    pub async fn research(
        config: &DelveConfig,
        search: Arc<dyn GroundedSearch>,
        task: WebSearchTask,
    ) -> WebResearchOutput {
        let model = config
            .models
            .model_for(Stage::QueryGenerator, Provider::Gemini)
            .to_string();

        match Self::run_search(search.as_ref(), &model, &task).await {
            Ok(output) => {
                info!(
                    id = task.id,
                    query = %task.search_query,
                    sources = output.sources_gathered.len(),
                    "Web research complete"
                );
                output
            }
            Err(e) => {
                warn!(id = task.id, query = %task.search_query, error = %e, "Web research failed");
                WebResearchOutput {
                    sources_gathered: Vec::new(),
                    web_research_result: format!(
                        "Search for \"{}\" failed: {}",
                        task.search_query, e
                    ),
                    search_query: task.search_query,
                }
            }
        }
    }

    async fn run_search(
        search: &dyn GroundedSearch,
        model: &str,
        task: &WebSearchTask,
    ) -> DelveResult<WebResearchOutput> {
        let prompt = create_web_searcher_prompt(&task.search_query, &current_date());
        let response = search.search(model, &prompt).await?;

        let chunks = response
            .grounding()
            .map(|m| m.grounding_chunks.as_slice())
            .unwrap_or_default();
        let resolved = resolve_urls(chunks, task.id);
        let citations = get_citations(&response, &resolved);
        let text = insert_citation_markers(&response.text(), &citations);

        Ok(WebResearchOutput {
            sources_gathered: citations.into_iter().flat_map(|c| c.segments).collect(),
            search_query: task.search_query.clone(),
            web_research_result: text,
        })
    }

    /// Run every task with at most `research.max_concurrent_searches` in flight
    ///
    /// Outputs come back in task order.
    pub async fn research_all(
        &self,
        config: &DelveConfig,
        search: Arc<dyn GroundedSearch>,
        tasks: Vec<WebSearchTask>,
    ) -> Vec<WebResearchOutput> {
        let shared = Arc::new(config.clone());
        let fallback: Vec<String> = tasks.iter().map(|t| t.search_query.clone()).collect();

        let results = process_concurrently(
            tasks,
            config.research.max_concurrent_searches,
            move |task| {
                let config = Arc::clone(&shared);
                let search = Arc::clone(&search);
                async move { Ok(Self::research(&config, search, task).await) }
            },
        )
        .await;

        results
            .into_iter()
            .zip(fallback)
            .map(|(result, query)| {
                result.unwrap_or_else(|e| WebResearchOutput {
                    sources_gathered: Vec::new(),
                    web_research_result: format!("Search for \"{}\" failed: {}", query, e),
                    search_query: query,
                })
            })
            .collect()
    }
}
