//! Web research handlers

use super::types::{to_messages, ErrorResponse, ResearchRequest};
use crate::{AppState, WebError};
use axum::{extract::State, response::Json, Json as JsonExtractor};
use delve_core::{ConfigOverrides, Message};
use delve_research::ResearchOutcome;
use tracing::info;

/// Research the question on the web and answer with citations
#[utoipa::path(
    post,
    path = "/api/research",
    tag = "Research",
    summary = "Run web research",
    description = "Generate search queries, run grounded searches, reflect until the findings suffice, then write a cited answer",
    request_body = ResearchRequest,
    responses(
        (status = 200, description = "Research outcome", body = ResearchOutcome),
        (status = 400, description = "Invalid override", body = ErrorResponse)
    )
)]
pub async fn run_research(
    State(state): State<AppState>,
    JsonExtractor(request): JsonExtractor<ResearchRequest>,
) -> Result<Json<ResearchOutcome>, WebError> {
    let mut overrides = match &request.overrides {
        Some(overrides) => overrides
            .to_config_overrides()
            .map_err(|e| WebError::BadRequest(e.to_string()))?,
        None => ConfigOverrides::default(),
    };
    overrides.initial_search_query_count = request.initial_search_query_count;
    overrides.max_research_loops = request.max_research_loops;
    overrides.reasoning_model = request.reasoning_model.clone();

    let mut messages = to_messages(&request.conversation_history);
    if !request.message.trim().is_empty() {
        messages.push(Message::user(request.message.clone()));
    }

    info!(messages = messages.len(), "Processing research request");
    let outcome = state.research.run(messages, &overrides).await;

    info!(
        success = outcome.success,
        loops = outcome.research_loop_count,
        sources = outcome.sources.len(),
        "Research request finished"
    );
    Ok(Json(outcome))
}
