use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::signal;
use tracing::info;

mod api;
mod backends;
mod config;
mod error;
mod relay;
mod state;

use config::Config;

const HEALTHCHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Docker HEALTHCHECK mode: hit /healthz and exit without starting a server.
    if std::env::args().nth(1).as_deref() == Some("--healthcheck") {
        return healthcheck().await;
    }

    init_tracing();

    // No TRAVEL_RELAY_CONFIG means built-in defaults plus env overrides.
    let config_path = std::env::var("TRAVEL_RELAY_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to build config from environment".to_owned(),
    })?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;

    let state = Arc::new(state::AppState::new(Arc::new(config)).context("building backend client")?);

    info!(
        model = state.backend.model(),
        backend = %state.config.backend.api_url,
        timeout_ms = state.config.backend.timeout_ms,
        "travel-relay starting"
    );

    let trace_layer = tower_http::trace::TraceLayer::new_for_http()
        .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
        .on_response(tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO));

    let app = api::router(state)
        .layer(axum::middleware::from_fn(api::request_id::request_id_middleware))
        .layer(trace_layer);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "chat API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("chat API server error")?;

    info!("shutdown complete");
    Ok(())
}

/// `RUST_LOG` filter (default `travel_relay=info,tower_http=warn`);
/// `TRAVEL_RELAY_LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "travel_relay=info,tower_http=warn".into());

    let json = std::env::var("TRAVEL_RELAY_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// `travel-relay --healthcheck`: GET /healthz on the configured port, exit 0 on 200, 1 otherwise.
///
/// The port is resolved the same way as at startup (config file, then env);
/// an unloadable config falls back to the default port.
async fn healthcheck() -> anyhow::Result<()> {
    let config_path = std::env::var("TRAVEL_RELAY_CONFIG").ok().map(PathBuf::from);
    let server = Config::load(config_path.as_deref())
        .map(|c| c.server)
        .unwrap_or_default();

    let client = reqwest::Client::builder()
        .timeout(HEALTHCHECK_TIMEOUT)
        .build()
        .context("building healthcheck client")?;

    let ok = match client.get(server.healthz_url()).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    };
    std::process::exit(if ok { 0 } else { 1 });
}
