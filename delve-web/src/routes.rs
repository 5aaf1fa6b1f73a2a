//! Route definitions for the Delve web server

use crate::{handlers, openapi, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};
use tracing::warn;

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/dual-model-chat", post(handlers::dual_model_chat))
        .route("/chat", post(handlers::chat_query))
        .route("/research", post(handlers::run_research))
        .route("/models", get(handlers::list_models))
        .route("/openapi.json", get(openapi::openapi_json))
}

/// Serve the frontend build under `/app`, or a 503 when it is missing
pub fn frontend_routes(static_dir: Option<&str>) -> Router<AppState> {
    let build = static_dir
        .map(Path::new)
        .filter(|dir| dir.join("index.html").is_file());

    match build {
        Some(dir) => {
            let index = dir.join("index.html");
            Router::new().nest_service(
                "/app",
                ServeDir::new(dir).fallback(ServeFile::new(index)),
            )
        }
        None => {
            if let Some(dir) = static_dir {
                warn!("No index.html in {}, /app will report the frontend as not built", dir);
            }
            Router::new()
                .route("/app", get(handlers::frontend_unavailable))
                .route("/app/{*path}", get(handlers::frontend_unavailable))
        }
    }
}
