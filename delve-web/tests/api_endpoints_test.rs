//! HTTP endpoint tests against the router with canned models

mod helpers;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use delve_core::DelveConfig;
use delve_research::{DualModelOutcome, ProcessingStage, ResearchOutcome, SingleModelReply};
use delve_web::create_app;
use delve_web::handlers::{HealthResponse, ModelsResponse};
use helpers::{keyed_config, spawn_app, test_state, CannedFactory};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::json;
use tower::ServiceExt;

async fn post<T: DeserializeOwned>(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, T) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get<T: DeserializeOwned>(app: axum::Router, uri: &str) -> (StatusCode, T) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let app = create_app(test_state(DelveConfig::default(), CannedFactory::default()));
    let (status, health): (_, HealthResponse) = get(app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health.status, "healthy");
    assert_eq!(health.service, "delve-dual-model-chat");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_dual_model_chat_success() {
    let app = create_app(test_state(keyed_config(), CannedFactory::default()));
    let (status, outcome): (_, DualModelOutcome) = post(
        app,
        "/api/dual-model-chat",
        json!({
            "message": "hello",
            "conversation_history": [
                {"role": "user", "content": "earlier"},
                {"role": "assistant", "content": "reply"}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(outcome.success);
    assert_eq!(outcome.processing_stage, ProcessingStage::Completed);
    assert_eq!(outcome.gemini_response, "gemini reply");
    assert_eq!(outcome.siliconflow_response, "siliconflow reply");
    assert_eq!(outcome.integrated_response, "merged answer");
    assert_eq!(outcome.error_message, None);
}

#[tokio::test]
async fn test_dual_model_chat_one_branch_down() {
    let factory = CannedFactory { fail_gemini: true };
    let app = create_app(test_state(keyed_config(), factory));
    let (status, outcome): (_, DualModelOutcome) =
        post(app, "/api/dual-model-chat", json!({"message": "hello"})).await;

    assert_eq!(status, StatusCode::OK);
    assert!(outcome.success);
    assert!(outcome.gemini_response.starts_with("Gemini model call failed"));
    assert_eq!(outcome.integrated_response, "merged answer");
}

#[tokio::test]
async fn test_dual_model_chat_missing_key_reports_error() {
    let mut config = keyed_config();
    config.api.siliconflow_api_key = None;
    let app = create_app(test_state(config, CannedFactory::default()));
    let (status, outcome): (_, DualModelOutcome) =
        post(app, "/api/dual-model-chat", json!({"message": "hello"})).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!outcome.success);
    assert_eq!(outcome.processing_stage, ProcessingStage::Error);
    assert!(outcome
        .error_message
        .unwrap_or_default()
        .contains("SILICONFLOW_API_KEY"));
}

#[tokio::test]
async fn test_dual_model_chat_rejects_malformed_body() {
    let app = create_app(test_state(keyed_config(), CannedFactory::default()));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/dual-model-chat")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"conversation_history": []}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_chat_with_provider_override() {
    let app = create_app(test_state(keyed_config(), CannedFactory::default()));
    let (status, reply): (_, SingleModelReply) = post(
        app,
        "/api/chat",
        json!({"message": "hi", "overrides": {"chat_provider": "siliconflow"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(reply.success);
    assert_eq!(reply.provider, "siliconflow");
    assert_eq!(reply.model, "Qwen/Qwen2.5-7B-Instruct");
    assert_eq!(reply.response, "siliconflow reply");
}

#[tokio::test]
async fn test_chat_rejects_unknown_provider() {
    let app = create_app(test_state(keyed_config(), CannedFactory::default()));
    let (status, body): (_, serde_json::Value) = post(
        app,
        "/api/chat",
        json!({"message": "hi", "overrides": {"chat_provider": "openai"}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("openai"));
}

#[tokio::test]
async fn test_research_returns_restored_sources() {
    let app = create_app(test_state(keyed_config(), CannedFactory::default()));
    let (status, outcome): (_, ResearchOutcome) = post(
        app,
        "/api/research",
        json!({"message": "How often do Rust editions ship?", "max_research_loops": 1}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(outcome.success, "{:?}", outcome.error_message);
    assert_eq!(outcome.search_queries, vec!["rust editions"]);
    assert_eq!(
        outcome.answer,
        "Editions ship every three years [rust](https://doc.rust-lang.org/edition-guide)."
    );
    assert_eq!(outcome.sources.len(), 1);
    assert_eq!(outcome.sources[0].label, "rust-lang");
}

#[tokio::test]
async fn test_models_lists_every_stage() {
    let mut config = DelveConfig::default();
    config.models.chat_provider = Some(delve_core::Provider::SiliconFlow);
    config.api.gemini_api_key = Some("k".to_string());
    let app = create_app(test_state(config, CannedFactory::default()));

    let (status, models): (_, ModelsResponse) = get(app, "/api/models").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(models.models.len(), 4);

    let chat = models.models.iter().find(|m| m.stage == "chat").unwrap();
    assert_eq!(chat.provider, "siliconflow");
    assert!(!chat.api_key_set);
    assert_eq!(models.missing_keys, vec!["SILICONFLOW_API_KEY"]);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = create_app(test_state(DelveConfig::default(), CannedFactory::default()));
    let (status, doc): (_, serde_json::Value) = get(app, "/api/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/dual-model-chat"].is_object());
}

#[tokio::test]
async fn test_frontend_served_from_static_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>delve</html>").unwrap();

    let mut state = test_state(DelveConfig::default(), CannedFactory::default());
    state.config.static_dir = Some(dir.path().to_string_lossy().to_string());
    let app = create_app(state);

    let response = app
        .oneshot(Request::builder().uri("/app/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"<html>delve</html>");
}

#[tokio::test]
async fn test_spawned_server_answers_over_tcp() {
    let app = spawn_app(test_state(keyed_config(), CannedFactory::default())).await;

    let response = app.get_health().await;
    assert!(response.status().is_success());

    let response = app
        .post_json("/api/dual-model-chat", &json!({"message": "hello"}))
        .await;
    assert!(response.status().is_success());
    let outcome: DualModelOutcome = response.json().await.unwrap();
    assert!(outcome.success);
}
