//! Final answer generation

use crate::citations::restore_short_urls;
use crate::prompts::{create_answer_prompt, current_date};
use crate::types::{ResearchOutcome, ResearchStage, ResearchState};
use delve_core::{DelveConfig, Stage};
use delve_llm::{ModelFactory, ModelRequest};
use std::sync::Arc;
use tracing::{error, info};

const ANSWER_TEMPERATURE: f32 = 0.0;

pub struct AnswerSynthesizer {
    factory: Arc<dyn ModelFactory>,
}

impl AnswerSynthesizer {
    pub fn new(factory: Arc<dyn ModelFactory>) -> Self {
        Self { factory }
    }

    /// Write the answer from every gathered summary and swap short URLs back
    pub async fn finalize(&self, config: &DelveConfig, state: &ResearchState) -> ResearchOutcome {
        let topic = state.research_topic();
        let prompt = create_answer_prompt(&topic, &state.web_research_results, &current_date());

        let reply = match self
            .factory
            .create(config, ModelRequest::new(Stage::Answer, ANSWER_TEMPERATURE))
            .await
        {
            Ok(model) => model.complete(&prompt).await,
            Err(e) => Err(e),
        };

        match reply {
            Ok(text) => {
                let (answer, sources) = restore_short_urls(&text, &state.sources_gathered);
                info!(
                    loops = state.research_loop_count,
                    queries = state.search_queries.len(),
                    cited = sources.len(),
                    "Research answer finalized"
                );

                ResearchOutcome {
                    answer,
                    sources,
                    search_queries: state.search_queries.clone(),
                    research_loop_count: state.research_loop_count,
                    stage: ResearchStage::Finalized,
                    success: true,
                    error_message: None,
                }
            }
            Err(e) => {
                error!(error = %e, "Answer generation failed");
                ResearchOutcome::failed(state, format!("Answer generation failed: {}", e))
            }
        }
    }
}
