//! Frontend fallback

use axum::{http::StatusCode, response::IntoResponse};

pub const FRONTEND_NOT_BUILT: &str =
    "Frontend not built. Build the frontend and point DELVE_STATIC_DIR at its output directory.";

/// Served under `/app` when no frontend build is available
pub async fn frontend_unavailable() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, FRONTEND_NOT_BUILT)
}
