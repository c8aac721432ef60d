//! Embedding seam.
//!
//! Async is required because every real provider (Ollama, OpenAI-compatible)
//! performs HTTP requests.

use crate::errors::RagError;
use std::{future::Future, pin::Pin};

/// Provider interface for embedding generation.
///
/// Implement this trait to plug in an embedding backend. Implementations
/// return vectors of one fixed dimension.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;
}

pub mod llm;
