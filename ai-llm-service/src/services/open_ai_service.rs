//! OpenAI-compatible service for chat completions and embeddings.
//!
//! Minimal, non-streaming client around the OpenAI REST dialect, which is also
//! spoken by Groq. Endpoints are derived from `LlmModelConfig::endpoint`:
//! - POST {endpoint}/v1/chat/completions — chat completion (non-streaming)
//! - POST {endpoint}/v1/embeddings       — embeddings retrieval
//!
//! Constructor validation:
//! - `cfg.provider` must be `LlmProvider::OpenAI`
//! - `cfg.api_key` must be present
//! - `cfg.endpoint` must start with http:// or https://

use std::time::{Duration, Instant};

use reqwest::header;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::{
    chat::ChatMessage,
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
    },
};

/// Thin client for an OpenAI-compatible API.
///
/// Internally keeps a preconfigured `reqwest::Client` (timeout and default
/// headers).
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    timeout: Duration,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - `InvalidProvider` if `cfg.provider` is not OpenAI
    /// - `MissingApiKey` if `cfg.api_key` is `None`
    /// - `InvalidEndpoint` if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::OpenAI {
            return Err(
                ProviderError::new(Provider::OpenAI, ProviderErrorKind::InvalidProvider).into(),
            );
        }

        let api_key = cfg.api_key.clone().ok_or_else(|| {
            ProviderError::new(Provider::OpenAI, ProviderErrorKind::MissingApiKey)
        })?;

        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                ProviderError::new(
                    Provider::OpenAI,
                    ProviderErrorKind::Decode(format!("invalid API key header: {e}")),
                )
            })?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let base = endpoint.trim_end_matches('/').to_string();
        let url_chat = format!("{}/v1/chat/completions", base);
        let url_embeddings = format!("{}/v1/embeddings", base);

        info!(
            provider = ?cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = timeout.as_secs(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            timeout,
            url_chat,
            url_embeddings,
        })
    }

    /// POSTs `body` to `url` and decodes a 2xx JSON reply; `expect` names the
    /// field callers read, for the decode error.
    async fn post_json<B, R>(&self, url: &str, body: &B, expect: &str) -> Result<R, AiLlmError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let started = Instant::now();
        debug!(%url, "POST");

        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AiLlmError::from_transport(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let snippet = make_snippet(&resp.text().await.unwrap_or_default());
            error!(
                %status,
                %url,
                %snippet,
                latency_ms = started.elapsed().as_millis(),
                "provider returned non-success status"
            );
            return Err(ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url: url.to_string(),
                    snippet,
                }),
            )
            .into());
        }

        resp.json::<R>().await.map_err(|e| {
            error!(error = %e, %url, "undecodable provider response");
            ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::Decode(format!("serde error: {e}; expected `{expect}`")),
            )
            .into()
        })
    }

    /// Non-streaming `/v1/chat/completions`; returns the first choice's text.
    ///
    /// `model`, `temperature`, `top_p` and `max_tokens` come from the profile.
    ///
    /// # Errors
    /// `HttpStatus`, `Decode` or `EmptyChoices` as [`ProviderError`], and
    /// [`AiLlmError::HttpTransport`] / [`AiLlmError::Timeout`] for network failures.
    #[instrument(skip_all, fields(model = %self.cfg.model, messages = messages.len()))]
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let body = ChatCompletionRequest::from_cfg(&self.cfg, messages);
        let out: ChatCompletionResponse = self
            .post_json(&self.url_chat, &body, "choices[0].message.content")
            .await?;

        let content = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::new(Provider::OpenAI, ProviderErrorKind::EmptyChoices))?;

        info!(
            latency_ms = started.elapsed().as_millis(),
            answer_len = content.len(),
            "chat completion completed"
        );
        Ok(content)
    }

    /// One embedding vector via `/v1/embeddings`.
    #[instrument(skip_all, fields(model = %self.cfg.model, input_len = input.len()))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input,
        };
        let out: EmbeddingsResponse = self
            .post_json(&self.url_embeddings, &body, "data[0].embedding")
            .await?;

        let first = out.data.into_iter().next().ok_or_else(|| {
            ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::Decode("empty `data` in embeddings response".into()),
            )
        })?;
        debug!(dim = first.embedding.len(), "embeddings completed");
        Ok(first.embedding)
    }
}

/* ===========================================================================
HTTP payloads & options
======================================================================== */

/// Request body for `/v1/chat/completions` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, messages: &'a [ChatMessage]) -> Self {
        Self {
            model: &cfg.model,
            messages,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatRole;

    fn groq_cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: "llama3-70b-8192".into(),
            endpoint: "https://api.groq.com/openai/".into(),
            api_key: Some("gsk-test".into()),
            max_tokens: Some(150),
            temperature: Some(0.7),
            top_p: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn request_body_carries_all_messages_and_knobs() {
        let cfg = groq_cfg();
        let messages = vec![
            ChatMessage::system("ctx"),
            ChatMessage::new(ChatRole::User, "hello"),
        ];
        let body = serde_json::to_value(ChatCompletionRequest::from_cfg(&cfg, &messages)).unwrap();
        assert_eq!(body["model"], "llama3-70b-8192");
        assert_eq!(body["max_tokens"], 150);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn urls_are_derived_from_endpoint() {
        let svc = OpenAiService::new(groq_cfg()).unwrap();
        assert_eq!(
            svc.url_chat,
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(svc.url_embeddings, "https://api.groq.com/openai/v1/embeddings");
    }

    #[test]
    fn missing_key_is_rejected() {
        let mut cfg = groq_cfg();
        cfg.api_key = None;
        let err = OpenAiService::new(cfg).unwrap_err();
        assert!(err.to_string().contains("missing API key"));
    }

    #[test]
    fn first_choice_without_content_decodes() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"42"}}]}"#;
        let out: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(out.choices[0].message.content.as_deref(), Some("42"));
    }
}
