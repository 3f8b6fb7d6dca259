//! HTTP surface: route table and CORS.
//!
//! Handlers only translate between HTTP and the relay; the relay logic itself
//! lives in [`crate::relay`] and [`crate::backends`].

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{config::ServerConfig, state::AppState};

pub mod chat;
pub mod health;
pub mod request_id;

/// Build the axum router with CORS applied.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/api/chat", post(chat::chat))
        .layer(cors)
        .with_state(state)
}

/// Any origin when `allowed_origins` is empty or contains `"*"`, otherwise
/// exactly the listed ones.
///
/// Origins are checked by [`crate::config::Config::validate`]; anything that
/// still fails to parse here is skipped.
pub fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let any = server.allowed_origins.is_empty() || server.allowed_origins.iter().any(|o| o == "*");
    let origin = if any {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            server
                .allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
