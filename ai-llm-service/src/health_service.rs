//! Reachability probes for the chat and embedding backends.
//!
//! - Ollama: `GET {endpoint}/api/tags`, model looked up by `name`
//! - OpenAI-compatible (Groq): `GET {endpoint}/v1/models` with Bearer auth, model looked up by `id`
//!
//! [`HealthService::check`] never fails; transport and status errors are folded into
//! a [`HealthStatus`] with `ok = false` so the result can be rendered by `/health` as-is.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// Health snapshot for one configured profile.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

/// Model listing returned by either backend; only the identifiers matter.
#[derive(Debug, Default, Deserialize)]
struct ModelListing {
    #[serde(default)]
    models: Vec<NamedModel>,
    #[serde(default)]
    data: Vec<IdModel>,
}

#[derive(Debug, Deserialize)]
struct NamedModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IdModel {
    id: String,
}

impl ModelListing {
    fn contains(&self, model: &str) -> bool {
        // Ollama tags carry an implicit `:latest` suffix.
        self.models
            .iter()
            .any(|m| m.name == model || m.name.strip_suffix(":latest") == Some(model))
            || self.data.iter().any(|m| m.id == model)
    }

    fn is_empty(&self) -> bool {
        self.models.is_empty() && self.data.is_empty()
    }
}

/// Probe runner sharing one HTTP client.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let default_timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder()
            .timeout(default_timeout)
            .build()?;
        Ok(Self {
            client,
            default_timeout,
        })
    }

    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let started = Instant::now();
        let outcome = self.probe(cfg).await;
        let latency_ms = started.elapsed().as_millis();

        let (ok, message) = match outcome {
            Ok(listing) if listing.contains(&cfg.model) => (true, "model is available".to_string()),
            Ok(listing) if listing.is_empty() => {
                (true, "backend reachable; model list unavailable".to_string())
            }
            Ok(_) => (false, "backend reachable, but model is not listed".to_string()),
            Err(err) => (false, err.to_string()),
        };

        let status = HealthStatus {
            provider: format!("{:?}", cfg.provider),
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            ok,
            latency_ms,
            message,
        };

        if status.ok {
            info!(provider = %status.provider, model = %status.model, latency_ms, "health probe ok");
        } else {
            warn!(
                provider = %status.provider,
                model = %status.model,
                latency_ms,
                message = %status.message,
                "health probe failed"
            );
        }
        status
    }

    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    async fn probe(&self, cfg: &LlmModelConfig) -> Result<ModelListing, AiLlmError> {
        let base = cfg.endpoint.trim().trim_end_matches('/');
        let url = match cfg.provider {
            LlmProvider::Ollama => format!("{base}/api/tags"),
            LlmProvider::OpenAI => format!("{base}/v1/models"),
        };
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let mut req = self.client.get(&url).timeout(timeout);
        if cfg.provider == LlmProvider::OpenAI {
            let key = cfg
                .api_key
                .as_deref()
                .ok_or_else(|| HealthError::Decode("missing API key".into()))?;
            let value = header::HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;
            req = req.header(header::AUTHORIZATION, value);
        }

        debug!(%url, "health GET");
        let resp = req
            .send()
            .await
            .map_err(|e| AiLlmError::from_transport(e, timeout))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet: make_snippet(&text),
            })
            .into());
        }

        // An undecodable listing still proves the backend is up.
        Ok(resp.json::<ModelListing>().await.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_tags_match_with_latest_suffix() {
        let raw = r#"{"models":[{"name":"all-minilm:latest"},{"name":"llama3"}]}"#;
        let listing: ModelListing = serde_json::from_str(raw).unwrap();
        assert!(listing.contains("all-minilm"));
        assert!(listing.contains("llama3"));
        assert!(!listing.contains("mistral"));
    }

    #[test]
    fn openai_models_match_by_id() {
        let raw = r#"{"object":"list","data":[{"id":"llama3-70b-8192","object":"model"}]}"#;
        let listing: ModelListing = serde_json::from_str(raw).unwrap();
        assert!(listing.contains("llama3-70b-8192"));
        assert!(!listing.is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_reports_not_ok() {
        let svc = HealthService::new(Some(1)).unwrap();
        let cfg = LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "all-minilm".into(),
            endpoint: "http://127.0.0.1:9".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        };
        let status = svc.check(&cfg).await;
        assert!(!status.ok);
        assert_eq!(status.provider, "Ollama");
    }
}
