//! Error type for the file catalog.

use std::time::Duration;

use rag_store::RagError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("file {0} not found")]
    NotFound(i64),

    /// Upload rejected before touching storage.
    #[error("invalid file: {0}")]
    Validation(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Blocking SQLite task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("vector index error: {0}")]
    Index(#[from] RagError),

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("config error: {0}")]
    Config(String),
}
