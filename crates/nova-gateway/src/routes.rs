use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::Utc;
use futures::{Stream, StreamExt};
use tracing::error;

use nova_core::types::SessionId;
use nova_graph::TurnRequest;

use crate::schemas::{ChatRequest, ChatResponse};
use crate::state::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn unprocessable(detail: String) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({ "detail": detail })),
    )
}

// GET /health — no auth, always 200
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": "nova-agent",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment,
    }))
}

// GET /health/ready — 503 until the database answers
pub async fn ready(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.db.ping() {
        Ok(()) => Ok(Json(serde_json::json!({ "status": "ready" }))),
        Err(e) => {
            error!(error = %e, "Readiness check failed");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "degraded" })),
            ))
        }
    }
}

// POST /api/v1/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    body.validate().map_err(unprocessable)?;

    let request = TurnRequest {
        session_id: SessionId::from_str(&body.session_id),
        user_id: body.user_id,
        message: body.message,
    };

    match state.merger.run_turn(request).await {
        Ok((message, tool_used)) => Ok(Json(ChatResponse {
            message,
            tool_used,
            timestamp: Utc::now(),
        })),
        Err(e) => {
            error!(error = %e, "Chat turn failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "detail": "Failed to process chat message" })),
            ))
        }
    }
}

// POST /api/v1/chat/stream — one SSE data frame per turn event
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    body.validate().map_err(unprocessable)?;

    let request = TurnRequest {
        session_id: SessionId::from_str(&body.session_id),
        user_id: body.user_id,
        message: body.message,
    };

    let events = state
        .merger
        .stream_turn(request)
        .map(|event| Event::default().json_data(&event));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
