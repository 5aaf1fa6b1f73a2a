//! Research loop orchestration
//!
//! query generation -> web research fan-out -> reflection -> (more research
//! | answer). The loop is bounded by `max_research_loops`.

use crate::planner::QueryPlanner;
use crate::searcher::WebSearcher;
use crate::synthesizer::AnswerSynthesizer;
use crate::types::{
    NextStep, ReflectionVerdict, ResearchOutcome, ResearchStage, ResearchState, WebSearchTask,
};
use delve_core::{performance, ConfigOverrides, DelveConfig, Message};
use delve_llm::{ModelFactory, ProviderModelFactory};
use std::sync::Arc;
use tracing::info;

/// Decide whether to finalize or research the follow-up queries
///
/// New task ids continue after the `ran_queries` already issued.
pub fn decide_next(
    verdict: &ReflectionVerdict,
    loop_count: usize,
    max_loops: usize,
    ran_queries: usize,
) -> NextStep {
    if verdict.is_sufficient || loop_count >= max_loops || verdict.follow_up_queries.is_empty() {
        return NextStep::Finalize;
    }

    NextStep::Research(
        verdict
            .follow_up_queries
            .iter()
            .enumerate()
            .map(|(idx, query)| WebSearchTask {
                search_query: query.clone(),
                id: ran_queries + idx,
            })
            .collect(),
    )
}

/// Runs complete research sessions
pub struct ResearchEngine {
    config: DelveConfig,
    factory: Arc<dyn ModelFactory>,
    planner: QueryPlanner,
    searcher: WebSearcher,
    synthesizer: AnswerSynthesizer,
}

impl ResearchEngine {
    pub fn new(config: DelveConfig) -> Self {
        Self::with_factory(config, Arc::new(ProviderModelFactory::new()))
    }

    pub fn with_factory(config: DelveConfig, factory: Arc<dyn ModelFactory>) -> Self {
        Self {
            config,
            planner: QueryPlanner::new(Arc::clone(&factory)),
            searcher: WebSearcher::new(),
            synthesizer: AnswerSynthesizer::new(Arc::clone(&factory)),
            factory,
        }
    }

    pub fn config(&self) -> &DelveConfig {
        &self.config
    }

    /// Research the conversation's topic and write a cited answer
    ///
    /// Failures never escape as errors; they come back as an outcome with
    /// `success = false`.
    pub async fn run(&self, messages: Vec<Message>, overrides: &ConfigOverrides) -> ResearchOutcome {
        performance::measure_async("research", self.research(messages, overrides)).await
    }

    async fn research(&self, messages: Vec<Message>, overrides: &ConfigOverrides) -> ResearchOutcome {
        let config = self.config.with_overrides(overrides);
        let mut state = ResearchState::new(messages, &config);

        let topic = state.research_topic();
        if topic.trim().is_empty() {
            return ResearchOutcome::failed(&state, "No research topic: the conversation is empty");
        }

        let search = match self.factory.searcher(&config) {
            Ok(search) => search,
            Err(e) => {
                e.log();
                return ResearchOutcome::failed(&state, e.to_string());
            }
        };

        info!(
            initial_queries = state.initial_search_query_count,
            max_loops = state.max_research_loops,
            "Starting research"
        );

        let queries = self
            .planner
            .plan_initial_queries(&config, &topic, state.initial_search_query_count)
            .await;
        let mut tasks: Vec<WebSearchTask> = queries
            .into_iter()
            .enumerate()
            .map(|(id, search_query)| WebSearchTask { search_query, id })
            .collect();

        loop {
            state.stage = ResearchStage::WebResearch;
            let outputs = self
                .searcher
                .research_all(&config, Arc::clone(&search), tasks)
                .await;
            for output in outputs {
                state.absorb(output);
            }

            let verdict = self.planner.reflect(&config, &mut state).await;
            match decide_next(
                &verdict,
                state.research_loop_count,
                state.max_research_loops,
                state.search_queries.len(),
            ) {
                NextStep::Finalize => break,
                NextStep::Research(next) => {
                    info!(
                        loop_count = state.research_loop_count,
                        knowledge_gap = %verdict.knowledge_gap,
                        follow_ups = next.len(),
                        "Researching follow-up queries"
                    );
                    tasks = next;
                }
            }
        }

        self.synthesizer.finalize(&config, &state).await
    }
}
