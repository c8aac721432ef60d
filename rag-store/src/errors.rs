//! Unified error types for the crate.

use ai_llm_service::error_handler::AiLlmError;
use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Point id is not a non-negative integer.
    #[error("invalid point id: {0:?}")]
    InvalidId(String),

    /// Embedding length differs from the collection dimension.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Embedding backend failed.
    #[error("embedding error: {0}")]
    Embedding(#[from] AiLlmError),

    /// Metadata could not be turned into a point payload.
    #[error("payload error: {0}")]
    Payload(String),

    /// Qdrant client errors (wrapped).
    #[error("qdrant error: {0}")]
    Qdrant(String),

    /// Index is not reachable (used by in-memory doubles as well).
    #[error("vector index unavailable: {0}")]
    Unavailable(String),
}
