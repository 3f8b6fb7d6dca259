//! Shared application state injected into every handler via [`axum::extract::State`].

use std::sync::Arc;

use crate::{backends::OllamaClient, config::Config};

/// Immutable per-process state: the startup config and the backend client.
///
/// Nothing here is mutated after construction, so requests share it without locks.
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: OllamaClient,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let backend = OllamaClient::new(&config.backend)?;
        Ok(Self { config, backend })
    }
}
