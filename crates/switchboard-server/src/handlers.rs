//! HTTP Handlers

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use switchboard_core::{Message, Outcome, ToolSchema};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub providers: usize,
    pub tools: usize,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub messages: Vec<Message>,
    pub outcome: Outcome,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: &str, code: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        providers: state.agent.providers().len(),
        tools: state.agent.tool_count(),
    })
}

/// Registered tool schemas
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolSchema>> {
    Json(state.agent.tool_schemas())
}

/// Run the conversation loop on a caller-supplied history
pub async fn answer_handler(
    State(state): State<AppState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    if payload.messages.is_empty() {
        return Err(bad_request("messages must not be empty", "EMPTY_HISTORY"));
    }

    let mut messages = payload.messages;
    let outcome = state.agent.answer(&mut messages).await;
    if outcome != Outcome::Answered {
        tracing::warn!(?outcome, "Answer ended without a model reply");
    }

    Ok(Json(AnswerResponse { messages, outcome }))
}

/// Single-question endpoint
pub async fn ask_handler(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(bad_request("message must not be empty", "EMPTY_MESSAGE"));
    }

    let message = state.agent.ask(payload.message).await;
    Ok(Json(AskResponse { message }))
}
