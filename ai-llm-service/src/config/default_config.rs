//! Default LLM configs loaded from environment variables.
//!
//! Two roles are used by the application:
//!
//! - **Chat**      → hosted completion model answering the user
//! - **Embedding** → embedding generator for uploaded files and queries
//!
//! # Environment variables
//!
//! Chat:
//! - `LLM_KIND`          = `openai` (default, also `groq`) or `ollama`
//! - `LLM_ENDPOINT`      = base URL (default `https://api.groq.com/openai` / Ollama endpoint)
//! - `LLM_API_KEY`       = required for OpenAI-compatible providers
//! - `LLM_MODEL`         = model id (default `llama3-70b-8192`)
//! - `LLM_MAX_TOKENS`    = completion cap (default 150)
//! - `LLM_TEMPERATURE`   = sampling temperature (default 0.7)
//! - `LLM_TIMEOUT_SECS`  = request timeout (default 30)
//!
//! Embedding:
//! - `EMBEDDING_KIND`         = `ollama` (default) or `openai`
//! - `EMBEDDING_ENDPOINT`     = base URL (default: Ollama endpoint)
//! - `EMBEDDING_API_KEY`      = required for OpenAI-compatible providers
//! - `EMBEDDING_MODEL`        = model id (default `all-minilm`, 384 dims)
//! - `EMBEDDING_TIMEOUT_SECS` = request timeout (default 30)
//!
//! Ollama endpoint: `OLLAMA_URL`, else `OLLAMA_PORT` → `http://localhost:{port}`,
//! else `http://localhost:11434`.

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_f32, env_opt_u32, env_opt_u64, must_env, opt_env,
        validate_http_endpoint, validate_range_f32,
    },
};

pub const DEFAULT_CHAT_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.groq.com/openai";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";
pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Resolves the Ollama endpoint from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
/// 3. `http://localhost:11434`
///
/// # Errors
///
/// - [`ConfigError::InvalidNumber`] if `OLLAMA_PORT` is invalid
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = opt_env("OLLAMA_URL") {
        return Ok(url);
    }
    if let Some(port) = opt_env("OLLAMA_PORT") {
        let _ = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Ok("http://localhost:11434".to_string())
}

fn provider_from_env(var: &'static str, default: LlmProvider) -> Result<LlmProvider, AiLlmError> {
    match opt_env(var) {
        Some(raw) => Ok(raw.parse::<LlmProvider>()?),
        None => Ok(default),
    }
}

fn endpoint_for(
    provider: LlmProvider,
    var: &'static str,
) -> Result<String, AiLlmError> {
    let endpoint = match opt_env(var) {
        Some(v) => v,
        None => match provider {
            LlmProvider::Ollama => ollama_endpoint()?,
            LlmProvider::OpenAI => DEFAULT_OPENAI_ENDPOINT.to_string(),
        },
    };
    validate_http_endpoint(var, &endpoint)?;
    Ok(endpoint)
}

fn api_key_for(provider: LlmProvider, var: &'static str) -> Result<Option<String>, AiLlmError> {
    match provider {
        LlmProvider::OpenAI => must_env(var).map(Some),
        LlmProvider::Ollama => Ok(opt_env(var)),
    }
}

/// Constructs the config for the **chat** (completion) model.
///
/// # Defaults
/// - provider `openai` against the Groq endpoint
/// - `model = llama3-70b-8192`
/// - `max_tokens = 150`, `temperature = 0.7`, `timeout_secs = 30`
///
/// # Errors
/// Missing API key for OpenAI-compatible providers, malformed numbers or URLs.
pub fn config_chat_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env("LLM_KIND", LlmProvider::OpenAI)?;
    let endpoint = endpoint_for(provider, "LLM_ENDPOINT")?;
    let api_key = api_key_for(provider, "LLM_API_KEY")?;
    let model = opt_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());
    let temperature = env_opt_f32("LLM_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE);
    validate_range_f32("temperature", temperature, 0.0, 2.0)?;

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        max_tokens: Some(env_opt_u32("LLM_MAX_TOKENS")?.unwrap_or(DEFAULT_MAX_TOKENS)),
        temperature: Some(temperature),
        top_p: None,
        timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    })
}

/// Constructs the config for the **embedding** model.
///
/// # Defaults
/// - provider `ollama`, `model = all-minilm`
/// - `temperature = Some(0.0)` (deterministic)
/// - `timeout_secs = 30`
pub fn config_embedding_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env("EMBEDDING_KIND", LlmProvider::Ollama)?;
    let endpoint = endpoint_for(provider, "EMBEDDING_ENDPOINT")?;
    let api_key = api_key_for(provider, "EMBEDDING_API_KEY")?;
    let model =
        opt_env("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(
            env_opt_u64("EMBEDDING_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
        ),
    })
}
