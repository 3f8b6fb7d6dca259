//! Process liveness and backend readiness endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /healthz` — always returns 200 OK with `{"status": "ok"}`.
///
/// No dependencies, never blocks; safe as a container liveness probe.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /readyz` — 200 if the inference backend passes the liveness probe, 503 otherwise.
pub async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.backend.probe().await {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" })))
    }
}
