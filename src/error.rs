//! Catch-all HTTP error type for axum request handlers.
//!
//! [`AppError`] wraps [`anyhow::Error`] so handlers can propagate unexpected
//! faults with `?`. The detail is logged; the caller only ever sees the fixed
//! `{"response": "An unexpected error occurred.", "success": false}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const UNEXPECTED_ERROR_REPLY: &str = "An unexpected error occurred.";

/// Wraps [`anyhow::Error`] so it can be returned from axum handlers.
///
/// Anything implementing `Into<anyhow::Error>` (including axum's extractor
/// rejections) converts via the blanket [`From`] implementation.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let detail = format!("{:#}", self.0);
        tracing::error!(error = %detail, "server error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "response": UNEXPECTED_ERROR_REPLY, "success": false })),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}
