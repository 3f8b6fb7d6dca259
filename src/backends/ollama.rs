//! Ollama adapter.
//!
//! Talks to Ollama's native `/api/generate` endpoint with `stream: false`, so
//! each generation is a single request/response. Liveness is checked against
//! Ollama's root endpoint (`GET /`), which answers `"Ollama is running"`.

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{RelayFailure, RelayResult};
use crate::config::BackendConfig;

/// Sampling options sent with every generation request.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_tokens: 150,
            top_p: 0.9,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Client for a locally-running Ollama instance.
///
/// [`Client`] wraps an `Arc`'d connection pool, so one instance is shared by
/// all requests. Timeouts are applied per call rather than on the client
/// because the probe and the generation call have different budgets.
pub struct OllamaClient {
    client: Client,
    generate_url: Url,
    probe_url: Url,
    model: String,
    timeout: Duration,
    probe_timeout: Duration,
}

impl OllamaClient {
    /// Build a client for the given backend config. No API key is involved.
    pub fn new(cfg: &BackendConfig) -> anyhow::Result<Self> {
        let generate_url = Url::parse(&cfg.api_url)
            .with_context(|| format!("invalid backend api_url `{}`", cfg.api_url))?;
        let probe_url = cfg.probe_url().context("resolving backend probe URL")?;

        let client = Client::builder()
            .build()
            .context("building reqwest client")?;

        Ok(Self {
            client,
            generate_url,
            probe_url,
            model: cfg.model.clone(),
            timeout: Duration::from_millis(cfg.timeout_ms),
            probe_timeout: Duration::from_millis(cfg.probe_timeout_ms),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Liveness probe: `true` only if `GET <probe_url>` answers HTTP 200 in time.
    ///
    /// Failures are logged, never returned.
    pub async fn probe(&self) -> bool {
        let result = self
            .client
            .get(self.probe_url.clone())
            .timeout(self.probe_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                warn!(url = %self.probe_url, status = %response.status(), "Ollama liveness probe failed");
                false
            }
            Err(e) => {
                warn!(url = %self.probe_url, error = %e, "Ollama liveness probe failed");
                false
            }
        }
    }

    /// Send one non-streaming generation request and return the trimmed text.
    ///
    /// No retries: a single failed attempt is final.
    pub async fn generate(&self, prompt: &str) -> RelayResult {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions::default(),
        };

        let response = self
            .client
            .post(self.generate_url.clone())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_failure(e))?;

        if status != StatusCode::OK {
            warn!(%status, body = %text, "Ollama API error");
            return Err(RelayFailure::Upstream(format!("HTTP {status}")));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            RelayFailure::Upstream(format!("parsing Ollama response as JSON: {e}"))
        })?;

        parsed
            .response
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or(RelayFailure::Empty)
    }

    fn transport_failure(&self, e: reqwest::Error) -> RelayFailure {
        if e.is_timeout() {
            RelayFailure::Timeout(self.timeout)
        } else {
            RelayFailure::Upstream(format!("POST {}: {e}", self.generate_url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn cfg_for(server: &MockServer) -> BackendConfig {
        BackendConfig {
            api_url: format!("{}/api/generate", server.uri()),
            model: "mistral".into(),
            timeout_ms: 5_000,
            probe_url: None,
            probe_timeout_ms: 5_000,
        }
    }

    fn client_for(server: &MockServer) -> OllamaClient {
        OllamaClient::new(&cfg_for(server)).unwrap()
    }

    async fn mount_generate(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    // -----------------------------------------------------------------------
    // OllamaClient::new
    // -----------------------------------------------------------------------

    #[test]
    fn new_rejects_invalid_api_url() {
        let cfg = BackendConfig {
            api_url: "::not a url::".into(),
            ..BackendConfig::default()
        };
        assert!(OllamaClient::new(&cfg).is_err());
    }

    #[test]
    fn new_succeeds_with_defaults() {
        let client = OllamaClient::new(&BackendConfig::default()).unwrap();
        assert_eq!(client.model(), "mistral");
        assert_eq!(client.probe_url.as_str(), "http://localhost:11434/");
    }

    // -----------------------------------------------------------------------
    // probe
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn probe_is_true_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Ollama is running"))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client_for(&server).probe().await);
    }

    #[tokio::test]
    async fn probe_is_false_on_other_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert!(!client_for(&server).probe().await);
    }

    #[tokio::test]
    async fn probe_is_false_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(!client_for(&server).probe().await);
    }

    #[tokio::test]
    async fn probe_is_false_when_backend_is_unreachable() {
        // Port 1 is reserved and never responds — guaranteed connection refusal.
        let cfg = BackendConfig {
            api_url: "http://127.0.0.1:1/api/generate".into(),
            ..BackendConfig::default()
        };
        assert!(!OllamaClient::new(&cfg).unwrap().probe().await);
    }

    #[tokio::test]
    async fn probe_is_false_when_backend_is_slower_than_probe_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let cfg = BackendConfig {
            probe_timeout_ms: 100,
            ..cfg_for(&server)
        };
        assert!(!OllamaClient::new(&cfg).unwrap().probe().await);
    }

    #[tokio::test]
    async fn probe_uses_explicit_probe_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = BackendConfig {
            probe_url: Some(format!("{}/health", server.uri())),
            ..cfg_for(&server)
        };
        assert!(OllamaClient::new(&cfg).unwrap().probe().await);
    }

    // -----------------------------------------------------------------------
    // generate
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn generate_sends_model_prompt_and_fixed_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "mistral",
                "prompt": "where to?",
                "stream": false,
                "options": { "temperature": 0.5, "max_tokens": 150, "top_p": 0.9 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Lisbon" })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).generate("where to?").await.unwrap();
        assert_eq!(text, "Lisbon");
    }

    #[tokio::test]
    async fn generate_trims_response_text() {
        let server = MockServer::start().await;
        mount_generate(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "response": "\n  - **Kyoto**: temples  \n" })),
        )
        .await;

        let text = client_for(&server).generate("x").await.unwrap();
        assert_eq!(text, "- **Kyoto**: temples");
    }

    #[tokio::test]
    async fn generate_reports_empty_for_missing_response_field() {
        let server = MockServer::start().await;
        mount_generate(&server, ResponseTemplate::new(200).set_body_json(json!({ "done": true }))).await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        assert!(matches!(err, RelayFailure::Empty), "got: {err:?}");
    }

    #[tokio::test]
    async fn generate_reports_empty_for_blank_response_field() {
        let server = MockServer::start().await;
        mount_generate(&server, ResponseTemplate::new(200).set_body_json(json!({ "response": "   " }))).await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        assert!(matches!(err, RelayFailure::Empty), "got: {err:?}");
    }

    #[tokio::test]
    async fn generate_reports_upstream_error_on_non_200() {
        let server = MockServer::start().await;
        mount_generate(&server, ResponseTemplate::new(404).set_body_string("model 'mistral' not found")).await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        match err {
            RelayFailure::Upstream(detail) => assert!(detail.contains("404"), "detail: {detail}"),
            other => panic!("expected Upstream, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_reports_upstream_error_on_invalid_json() {
        let server = MockServer::start().await;
        mount_generate(&server, ResponseTemplate::new(200).set_body_string("not valid json {{{{")).await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        assert!(matches!(err, RelayFailure::Upstream(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn generate_reports_timeout_when_backend_is_too_slow() {
        let server = MockServer::start().await;
        mount_generate(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "too late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        let cfg = BackendConfig {
            timeout_ms: 200,
            ..cfg_for(&server)
        };
        let err = OllamaClient::new(&cfg).unwrap().generate("x").await.unwrap_err();
        assert!(matches!(err, RelayFailure::Timeout(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn generate_reports_upstream_error_on_connection_refused() {
        let cfg = BackendConfig {
            api_url: "http://127.0.0.1:1/api/generate".into(),
            ..BackendConfig::default()
        };
        let err = OllamaClient::new(&cfg).unwrap().generate("x").await.unwrap_err();
        assert!(matches!(err, RelayFailure::Upstream(_)), "got: {err:?}");
    }
}
