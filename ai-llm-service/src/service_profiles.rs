//! Shared LLM service with two profiles: `chat` and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Builds the underlying HTTP clients eagerly, so a bad profile fails at startup.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::chat::ChatMessage;
//! use ai_llm_service::config::default_config::{config_chat_from_env, config_embedding_from_env};
//! use ai_llm_service::service_profiles::LlmServiceProfiles;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let svc = Arc::new(LlmServiceProfiles::new(
//!     config_chat_from_env()?,
//!     config_embedding_from_env()?,
//!     Some(10),
//! )?);
//!
//! let txt = svc.chat(&[ChatMessage::user("Hello world")]).await?;
//! let emb = svc.embed("Ferris").await?;
//! println!("{txt} / dim = {}", emb.len());
//! # Ok(()) }
//! ```

use futures::future::BoxFuture;

use crate::{
    chat::{ChatCompletion, ChatMessage},
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::AiLlmError,
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Provider-specific client behind one profile.
#[derive(Debug)]
enum ProviderClient {
    Ollama(OllamaService),
    OpenAi(OpenAiService),
}

impl ProviderClient {
    fn build(cfg: &LlmModelConfig) -> Result<Self, AiLlmError> {
        Ok(match cfg.provider {
            LlmProvider::Ollama => ProviderClient::Ollama(OllamaService::new(cfg.clone())?),
            LlmProvider::OpenAI => ProviderClient::OpenAi(OpenAiService::new(cfg.clone())?),
        })
    }
}

/// Shared service that manages the **chat** and **embedding** profiles.
pub struct LlmServiceProfiles {
    chat_cfg: LlmModelConfig,
    embedding_cfg: LlmModelConfig,

    chat: ProviderClient,
    embedding: ProviderClient,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service with two profiles.
    ///
    /// - `chat`: completion profile (max tokens and temperature live here).
    /// - `embedding`: embedding profile.
    /// - `health_timeout_secs`: optional timeout for the health checker.
    pub fn new(
        chat: LlmModelConfig,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        Ok(Self {
            chat: ProviderClient::build(&chat)?,
            embedding: ProviderClient::build(&embedding)?,
            chat_cfg: chat,
            embedding_cfg: embedding,
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Runs a non-streaming completion with the **chat** profile.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if the provider call fails.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        match &self.chat {
            ProviderClient::Ollama(cli) => cli.chat(messages).await,
            ProviderClient::OpenAi(cli) => cli.chat(messages).await,
        }
    }

    /// Computes embeddings using the **embedding** profile.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if embedding fails.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        match &self.embedding {
            ProviderClient::Ollama(cli) => cli.embeddings(input).await,
            ProviderClient::OpenAi(cli) => cli.embeddings(input).await,
        }
    }

    /// Returns a health snapshot for all distinct profiles.
    ///
    /// If the embedding profile equals the chat profile, it is checked only once.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = Vec::<LlmModelConfig>::with_capacity(2);
        list.push(self.chat_cfg.clone());
        if self.embedding_cfg != self.chat_cfg {
            list.push(self.embedding_cfg.clone());
        }
        self.health.check_many(&list).await
    }
}

impl ChatCompletion for LlmServiceProfiles {
    fn complete<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<String, AiLlmError>> {
        Box::pin(self.chat(messages))
    }
}
