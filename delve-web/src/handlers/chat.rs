//! Chat handlers

use super::types::{to_messages, ChatRequest, DualModelChatRequest, ErrorResponse};
use crate::{AppState, WebError};
use axum::{extract::State, response::Json, Json as JsonExtractor};
use delve_core::ConfigOverrides;
use delve_research::{DualModelOutcome, SingleModelReply};
use tracing::info;

/// Ask Gemini and SiliconFlow in parallel and merge their answers
///
/// Model failures are reported in the body; the status is 200 for every
/// well-formed request.
#[utoipa::path(
    post,
    path = "/api/dual-model-chat",
    tag = "Chat",
    summary = "Dual-model chat",
    description = "Query Gemini and SiliconFlow concurrently, then merge both answers with the SiliconFlow model",
    request_body = DualModelChatRequest,
    responses(
        (status = 200, description = "Outcome of the dual-model flow", body = DualModelOutcome),
        (status = 422, description = "Malformed request body")
    )
)]
pub async fn dual_model_chat(
    State(state): State<AppState>,
    JsonExtractor(request): JsonExtractor<DualModelChatRequest>,
) -> Json<DualModelOutcome> {
    info!(
        history = request.conversation_history.len(),
        "Processing dual-model chat request"
    );

    let history = to_messages(&request.conversation_history);
    let outcome = state.dual_chat.chat(&request.message, &history).await;

    info!(
        stage = ?outcome.processing_stage,
        success = outcome.success,
        "Dual-model chat finished"
    );
    Json(outcome)
}

/// Chat with the model configured for the chat stage
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "Chat",
    summary = "Single-model chat",
    description = "Answer with the chat stage model, optionally overriding provider or model per request",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Model reply", body = SingleModelReply),
        (status = 400, description = "Invalid override", body = ErrorResponse)
    )
)]
pub async fn chat_query(
    State(state): State<AppState>,
    JsonExtractor(request): JsonExtractor<ChatRequest>,
) -> Result<Json<SingleModelReply>, WebError> {
    let overrides = match &request.overrides {
        Some(overrides) => overrides
            .to_config_overrides()
            .map_err(|e| WebError::BadRequest(e.to_string()))?,
        None => ConfigOverrides::default(),
    };

    let history = to_messages(&request.conversation_history);
    let reply = state
        .single_chat
        .chat(&request.message, &history, &overrides)
        .await;

    info!(
        provider = %reply.provider,
        model = %reply.model,
        success = reply.success,
        "Chat request finished"
    );
    Ok(Json(reply))
}
