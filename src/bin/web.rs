//! Career Agent HTTP 接口
//!
//! 启动: cargo run --bin career-agent-web --features web
//! POST /api/chat {"message": "...", "session_id": "..."}

#![cfg(feature = "web")]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use career_agent::agent::{create_agent_components, AgentRuntime};
use career_agent::config::load_config;
use career_agent::core::ReplyOutcome;
use career_agent::observability;

struct AppState {
    runtime: AgentRuntime,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ReplyOutcome>, ApiError> {
    let result = tokio::time::timeout(
        state.request_timeout,
        state
            .runtime
            .process_message(req.session_id.as_deref(), &req.message),
    )
    .await;

    match result {
        Ok(Ok(outcome)) => Ok(Json(outcome)),
        Ok(Err(e)) if e.is_client_error() => {
            Err(api_error(StatusCode::BAD_REQUEST, &e.to_string()))
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "chat request failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
        Err(_) => {
            tracing::error!(
                timeout_secs = state.request_timeout.as_secs(),
                "chat request timed out"
            );
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(api_chat))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;
    let state = Arc::new(AppState {
        runtime: AgentRuntime::from_config(create_agent_components(&cfg), &cfg.sessions),
        request_timeout: Duration::from_secs(cfg.web.request_timeout_secs),
    });

    let listener = tokio::net::TcpListener::bind(&cfg.web.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.web.bind))?;
    tracing::info!(bind = %cfg.web.bind, "career-agent-web listening");

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}
