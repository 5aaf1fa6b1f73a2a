//! Model configuration introspection

use super::types::{ModelsResponse, StageModelInfo};
use crate::AppState;
use axum::{extract::State, response::Json};

/// Resolved model per stage
#[utoipa::path(
    get,
    path = "/api/models",
    tag = "Configuration",
    summary = "List stage models",
    description = "Provider and model each pipeline stage resolves to, and which API keys are missing",
    responses(
        (status = 200, description = "Model configuration", body = ModelsResponse)
    )
)]
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state
            .delve
            .all_model_info()
            .into_iter()
            .map(StageModelInfo::from)
            .collect(),
        missing_keys: state
            .delve
            .missing_keys()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}
