//! Configuration types for travel-relay.
//!
//! Config is built once at startup: built-in defaults, optionally replaced by a
//! TOML file (`TRAVEL_RELAY_CONFIG`), then overridden by environment variables.
//! The result is validated before the server opens any ports.
//!
//! # Example
//! ```toml
//! [server]
//! port = 5000
//! allowed_origins = ["http://localhost:3000"]
//!
//! [backend]
//! api_url    = "http://localhost:11434/api/generate"
//! model      = "mistral"
//! timeout_ms = 60000
//! ```
//!
//! Environment overrides (applied after the file):
//!
//! | Variable            | Field                        |
//! |---------------------|------------------------------|
//! | `OLLAMA_API_URL`    | `backend.api_url`            |
//! | `OLLAMA_MODEL`      | `backend.model`              |
//! | `OLLAMA_TIMEOUT`    | `backend.timeout_ms` (secs)  |
//! | `TRAVEL_RELAY_PORT` | `server.port`                |

use std::path::Path;

use anyhow::Context;
use axum::http::HeaderValue;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Upper bound on the liveness probe; it gates every chat request.
pub const MAX_PROBE_TIMEOUT_MS: u64 = 5_000;

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub backend: BackendConfig,
}

impl Config {
    /// Build the startup config.
    ///
    /// `path` is the file named by `TRAVEL_RELAY_CONFIG`, if any. Without a
    /// path the built-in defaults are used. Environment overrides are applied
    /// on top in both cases.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).context("parsing config TOML")
    }

    /// Apply environment overrides. `lookup` resolves a variable name to its value.
    ///
    /// Empty values are ignored, matching an unset variable.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("OLLAMA_API_URL") {
            self.backend.api_url = url;
        }
        if let Some(model) = var("OLLAMA_MODEL") {
            self.backend.model = model;
        }
        if let Some(secs) = var("OLLAMA_TIMEOUT") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("OLLAMA_TIMEOUT must be whole seconds, got `{secs}`"))?;
            self.backend.timeout_ms = secs.saturating_mul(1_000);
        }
        if let Some(port) = var("TRAVEL_RELAY_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("TRAVEL_RELAY_PORT must be a port number, got `{port}`"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let api_url = parse_http_url(&self.backend.api_url).context("backend.api_url")?;
        if let Some(probe) = &self.backend.probe_url {
            parse_http_url(probe).context("backend.probe_url")?;
        }
        anyhow::ensure!(
            api_url.host_str().is_some(),
            "backend.api_url `{}` has no host",
            self.backend.api_url
        );
        anyhow::ensure!(!self.backend.model.trim().is_empty(), "backend.model must not be empty");
        anyhow::ensure!(self.backend.timeout_ms > 0, "backend.timeout_ms must be greater than 0");
        anyhow::ensure!(
            self.backend.probe_timeout_ms > 0,
            "backend.probe_timeout_ms must be greater than 0"
        );
        anyhow::ensure!(
            self.backend.probe_timeout_ms <= MAX_PROBE_TIMEOUT_MS,
            "backend.probe_timeout_ms must be at most {MAX_PROBE_TIMEOUT_MS}"
        );

        for origin in &self.server.allowed_origins {
            HeaderValue::from_str(origin)
                .with_context(|| format!("server.allowed_origins: invalid origin `{origin}`"))?;
        }
        Ok(())
    }
}

fn parse_http_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("`{raw}` is not a valid URL"))?;
    anyhow::ensure!(
        matches!(url.scheme(), "http" | "https"),
        "`{raw}` must use http or https"
    );
    Ok(url)
}

/// Inbound HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    #[serde(default = "defaults::host")]
    pub host: String,

    /// Listen port (default: 5000).
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Origins allowed by CORS. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Loopback URL of `/healthz` on the configured port.
    pub fn healthz_url(&self) -> String {
        format!("http://127.0.0.1:{}/healthz", self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            allowed_origins: Vec::new(),
        }
    }
}

/// The inference backend (a local Ollama instance).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Full URL generation requests are POSTed to.
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// Model identifier passed in every generation request.
    #[serde(default = "defaults::model")]
    pub model: String,

    /// Generation request timeout in milliseconds (default: 60 000).
    #[serde(default = "defaults::timeout_ms")]
    pub timeout_ms: u64,

    /// Liveness probe URL. Defaults to the root (`/`) of `api_url`'s host.
    #[serde(default)]
    pub probe_url: Option<String>,

    /// Liveness probe timeout in milliseconds (default and maximum: 5 000).
    #[serde(default = "defaults::probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl BackendConfig {
    /// Resolve the URL used by the liveness probe.
    pub fn probe_url(&self) -> anyhow::Result<Url> {
        if let Some(url) = &self.probe_url {
            return parse_http_url(url);
        }
        let mut url = parse_http_url(&self.api_url)?;
        url.set_path("/");
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::api_url(),
            model: defaults::model(),
            timeout_ms: defaults::timeout_ms(),
            probe_url: None,
            probe_timeout_ms: defaults::probe_timeout_ms(),
        }
    }
}

mod defaults {
    pub fn host() -> String { "0.0.0.0".into() }
    pub fn port() -> u16 { 5000 }
    pub fn api_url() -> String { "http://localhost:11434/api/generate".into() }
    pub fn model() -> String { "mistral".into() }
    pub fn timeout_ms() -> u64 { 60_000 }
    pub fn probe_timeout_ms() -> u64 { 5_000 }
}
