//! Inference backend client and the failure taxonomy of a relay call.
//!
//! Everything the backend can do wrong collapses into a [`RelayFailure`].
//! Its `Display` text carries internal detail (status codes, transport errors)
//! and is meant for logs only; handlers map each variant to a fixed,
//! user-safe message.

use std::time::Duration;

pub mod ollama;

pub use ollama::OllamaClient;

/// Outcome of one relay call: the model's text, or why there is none.
pub type RelayResult = Result<String, RelayFailure>;

/// Why a relay call produced no usable text.
#[derive(Debug, thiserror::Error)]
pub enum RelayFailure {
    /// The liveness probe failed; the backend was never asked to generate.
    #[error("inference backend is unreachable")]
    Unreachable,

    /// The generation call did not complete within the configured timeout.
    #[error("inference backend did not answer within {0:?} (model may not be loaded)")]
    Timeout(Duration),

    /// Non-200 status, undecodable body, or a transport fault.
    #[error("inference backend error: {0}")]
    Upstream(String),

    /// HTTP 200, but the `response` field was missing or blank.
    #[error("inference backend returned no text")]
    Empty,
}
