//! Typed error for the contextor crate.

use std::fmt;
use std::time::Duration;

use ai_llm_service::error_handler::AiLlmError;
use file_store::FileStoreError;
use rag_store::RagError;
use thiserror::Error;

/// Which token limit a conversation ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLimit {
    /// Per-request token cap of the hosted API.
    RateLimit,
    /// Model context window.
    ContextWindow,
}

impl fmt::Display for BudgetLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetLimit::RateLimit => f.write_str("rate limit"),
            BudgetLimit::ContextWindow => f.write_str("context window"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Conversation is empty or its last turn has no text.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("conversation needs {total} tokens, over the {kind} of {limit}")]
    BudgetExceeded {
        total: usize,
        limit: usize,
        kind: BudgetLimit,
    },

    #[error("embedding failed: {0}")]
    Embedding(RagError),

    #[error("vector search failed: {0}")]
    VectorSearch(RagError),

    #[error("record lookup failed: {0}")]
    RecordStore(#[from] FileStoreError),

    #[error("completion failed: {0}")]
    Completion(#[from] AiLlmError),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },
}
