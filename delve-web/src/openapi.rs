//! OpenAPI document for the Delve web server

use axum::response::Json;
use utoipa::OpenApi;

use crate::handlers::{
    ChatRequest, ConversationMessage, DualModelChatRequest, ErrorResponse, HealthResponse,
    ModelsResponse, RequestOverrides, ResearchRequest, StageModelInfo,
};
use delve_research::{
    DualModelOutcome, ProcessingStage, ResearchOutcome, ResearchStage, SingleModelReply,
    SourceRecord,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Delve API",
        version = "0.1.0",
        description = "Dual-model chat and web research backed by Gemini and SiliconFlow",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://127.0.0.1:2024", description = "Local development server")
    ),
    paths(
        crate::handlers::health_check,
        crate::handlers::dual_model_chat,
        crate::handlers::chat_query,
        crate::handlers::run_research,
        crate::handlers::list_models,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            ConversationMessage,
            RequestOverrides,
            DualModelChatRequest,
            DualModelOutcome,
            ProcessingStage,
            ChatRequest,
            SingleModelReply,
            ResearchRequest,
            ResearchOutcome,
            ResearchStage,
            SourceRecord,
            ModelsResponse,
            StageModelInfo,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Chat", description = "Single- and dual-model chat"),
        (name = "Research", description = "Grounded web research"),
        (name = "Configuration", description = "Model configuration introspection"),
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
