use crate::config::llm_provider::LlmProvider;

/// Configuration for an LLM model invocation.
///
/// One value describes one logical profile (the chat model or the embedding
/// model). Generation knobs are ignored by the embedding endpoints.
///
/// # Fields
///
/// - `provider`: Which LLM provider/backend to use (Ollama or OpenAI-compatible).
/// - `model`: The model identifier (e.g., `"llama3-70b-8192"`, `"all-minilm"`).
/// - `endpoint`: Base URL of the API (without the `/v1/...` suffix).
/// - `api_key`: Optional API key for providers that require authentication.
/// - `max_tokens`: Maximum number of tokens to generate.
/// - `temperature`: Controls randomness (0.0 = deterministic).
/// - `top_p`: Nucleus sampling cutoff (alternative to temperature).
/// - `timeout_secs`: Request timeout in seconds.
///
/// # Examples
///
/// ```
/// use ai_llm_service::config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::OpenAI,
///     model: "llama3-70b-8192".to_string(),
///     endpoint: "https://api.groq.com/openai".to_string(),
///     api_key: Some("gsk-...".to_string()),
///     max_tokens: Some(150),
///     temperature: Some(0.7),
///     top_p: None,
///     timeout_secs: Some(30),
/// };
/// assert_eq!(cfg.max_tokens, Some(150));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The LLM provider/backend.
    pub provider: LlmProvider,

    /// Model identifier string.
    pub model: String,

    /// Base URL of the provider API.
    pub endpoint: String,

    /// Optional API key for authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature (controls creativity).
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}
