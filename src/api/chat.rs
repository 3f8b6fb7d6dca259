//! `POST /api/chat` — the availability-gated relay endpoint.
//!
//! Per request: probe the backend, validate the message, relay it, and map the
//! outcome onto a fixed set of responses. Internal failure detail is logged,
//! never returned.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{backends::RelayFailure, error::AppError, relay, state::AppState};

pub const UNAVAILABLE_REPLY: &str =
    "Our travel service is currently unavailable. Please try again later.";
pub const GENERATION_FAILED_REPLY: &str =
    "I'm having trouble generating a response. Please try again.";
pub const EMPTY_MESSAGE_ERROR: &str = "Message cannot be empty";

/// Inbound chat body. A missing `message` is treated as empty.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Every way a chat request can end, short of an unexpected fault.
#[derive(Debug)]
pub enum ChatReply {
    Answer(String),
    EmptyMessage,
    Failed(RelayFailure),
}

impl IntoResponse for ChatReply {
    fn into_response(self) -> Response {
        match self {
            Self::Answer(text) => {
                (StatusCode::OK, Json(json!({ "response": text, "success": true })))
            }
            Self::EmptyMessage => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": EMPTY_MESSAGE_ERROR })))
            }
            Self::Failed(RelayFailure::Unreachable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "response": UNAVAILABLE_REPLY, "success": false })),
            ),
            Self::Failed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "response": GENERATION_FAILED_REPLY, "success": false })),
            ),
        }
        .into_response()
    }
}

/// `POST /api/chat`.
///
/// The body is extracted as a `Result` so the liveness probe runs before any
/// validation; a malformed body is then an unexpected fault (generic 500).
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<ChatReply, AppError> {
    if !state.backend.probe().await {
        return Ok(ChatReply::Failed(RelayFailure::Unreachable));
    }

    let Json(request) = payload?;
    let message = request.message.trim();
    if message.is_empty() {
        return Ok(ChatReply::EmptyMessage);
    }

    info!(input = %message, "processing chat message");

    Ok(match relay::relay(&state.backend, message).await {
        Ok(text) => ChatReply::Answer(text),
        Err(failure) => {
            warn!(reason = %failure, "relay failed");
            ChatReply::Failed(failure)
        }
    })
}
