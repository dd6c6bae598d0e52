use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::agent::{Agent, AgentCore};
use crate::config::Config;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

type ApiError = (StatusCode, Json<Value>);

pub fn build_app(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/upload", post(upload))
        .route("/session", get(session))
        .route("/query", post(query))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(agent)
}

/// Run the HTTP server until shutdown
pub async fn serve(config: &Config, agent: Arc<Agent>) -> Result<()> {
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(addr = %addr, status = agent.status_label(), "Serving");

    axum::serve(listener, build_app(agent))
        .await
        .context("Server error")?;

    Ok(())
}

/// 503 unless the agent initialized well enough to serve
fn require_core(agent: &Agent) -> Result<&AgentCore, ApiError> {
    agent.core().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "Agent not initialized",
                "detail": agent.error().unwrap_or("unknown"),
            })),
        )
    })
}

#[derive(Deserialize)]
struct ChatRequest {
    query: String,
    session_id: String,
    top_k: Option<usize>,
}

async fn chat(
    State(agent): State<Arc<Agent>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let core = require_core(&agent)?;

    let outcome = core
        .pipeline
        .chat(&req.query, &req.session_id, req.top_k)
        .await;

    Ok(Json(json!({
        "response": outcome.response,
        "sources": outcome.sources,
        "contextualized_query": outcome.contextualized_query,
    })))
}

async fn upload(
    State(agent): State<Arc<Agent>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let core = require_core(&agent)?;

    let docs_dir = crate::storage::get_documents_dir().map_err(internal_error)?;
    let mut results = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("Malformed multipart body: {}", e)})),
        )
    })? {
        let Some(file_name) = field.file_name().map(|n| n.to_string()) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("Failed to read upload: {}", e)})),
            )
        })?;

        // Keep the uploaded file so the corpus can be reindexed later
        let path = docs_dir.join(&file_name);
        std::fs::write(&path, &bytes).map_err(|e| internal_error(e.into()))?;

        let outcome = core.indexer.index_file(&path).await;
        results.push(json!({
            "filename": file_name,
            "source_id": outcome.source_id,
            "chunks_indexed": outcome.chunks_indexed,
            "was_cached": outcome.was_cached,
        }));
    }

    Ok(Json(json!({ "files": results })))
}

async fn session(State(agent): State<Arc<Agent>>) -> Result<Json<Value>, ApiError> {
    let core = require_core(&agent)?;
    let session_id = core.sessions.create();
    Ok(Json(json!({ "session_id": session_id })))
}

#[derive(Deserialize)]
struct QueryRequest {
    question: String,
    context: Option<String>,
}

async fn query(
    State(agent): State<Arc<Agent>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<Value>, ApiError> {
    let core = require_core(&agent)?;

    if let Some(context) = &req.context {
        debug!(context = %context, "Client-supplied query context");
    }

    let started = Instant::now();
    let outcome = core.router.process(&req.question).await;

    Ok(Json(json!({
        "answer": outcome.answer,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "processing_time": started.elapsed().as_secs_f64(),
    })))
}

async fn health(State(agent): State<Arc<Agent>>) -> Json<Value> {
    Json(json!({
        "status": agent.status_label(),
        "agent_ready": agent.is_ready(),
        "components": Value::Object(agent.components()),
    }))
}

fn internal_error(e: anyhow::Error) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": format!("{:#}", e)})),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn ready_app() -> Router {
        let agent = Agent::init(&Config::stub()).await;
        build_app(Arc::new(agent))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_ready() {
        let app = ready_app().await;

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["agent_ready"], true);
        assert_eq!(body["components"]["store"], "ready");
    }

    #[tokio::test]
    async fn test_failed_agent_yields_503() {
        let mut config = Config::stub();
        config.llm.provider = "nonexistent".to_string();
        let app = build_app(Arc::new(Agent::init(&config).await));

        let request = Request::post("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"query": "hi", "session_id": "s1"}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Agent not initialized");
    }

    #[tokio::test]
    async fn test_failed_agent_health_still_responds() {
        let mut config = Config::stub();
        config.llm.provider = "nonexistent".to_string();
        let app = build_app(Arc::new(Agent::init(&config).await));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(body["agent_ready"], false);
    }

    #[tokio::test]
    async fn test_session_returns_fresh_id() {
        let app = ready_app().await;

        let response = app
            .oneshot(Request::get("/session").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(!body["session_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_shape() {
        let app = ready_app().await;

        let request = Request::post("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"query": "How many in-office days?", "session_id": "s1"}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert!(body["response"].is_string());
        assert!(body["sources"].is_array());
        assert_eq!(body["contextualized_query"], "How many in-office days?");
    }

    #[tokio::test]
    async fn test_query_shape() {
        let app = ready_app().await;

        let request = Request::post("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"question": "vpn help"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert!(body["answer"].is_string());
        assert!(body["timestamp"].is_string());
        assert!(body["processing_time"].as_f64().unwrap() >= 0.0);
    }
}
