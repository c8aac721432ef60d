//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use tracing::warn;

/// Retrieval and budget knobs. All fields have defaults via `from_env`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextorConfig {
    /// Files fetched per chat query (`RAG_TOP_K`).
    pub top_k: u64,
    /// Token cap per file block (`PER_FILE_TOKENS`).
    pub per_file_tokens: usize,
    /// Token cap for the whole context string (`CONTEXT_TOKENS`).
    pub context_tokens: usize,
    /// Per-request token cap of the hosted model (`RATE_LIMIT_TOKENS`).
    pub rate_limit_tokens: usize,
    /// Model context window (`CONTEXT_WINDOW_TOKENS`).
    pub context_window_tokens: usize,
    /// Tokens held back for the answer (`RESERVED_COMPLETION_TOKENS`).
    pub reserved_completion_tokens: usize,
    /// Deadline for each pipeline stage. Not read here; the server hands down
    /// the file store's `CALL_TIMEOUT_SECS` so both crates share one value.
    pub call_timeout: Duration,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            per_file_tokens: 1000,
            context_tokens: 4000,
            rate_limit_tokens: 6000,
            context_window_tokens: 8192,
            reserved_completion_tokens: 1000,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables; unset or malformed values keep the
    /// default. `call_timeout` always starts at its default.
    ///
    /// # Example
    /// ```
    /// # use contextor::ContextorConfig;
    /// let cfg = ContextorConfig::from_env();
    /// assert!(cfg.top_k >= 1);
    /// ```
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            top_k: parse("RAG_TOP_K", d.top_k).max(1),
            per_file_tokens: parse("PER_FILE_TOKENS", d.per_file_tokens),
            context_tokens: parse("CONTEXT_TOKENS", d.context_tokens),
            rate_limit_tokens: parse("RATE_LIMIT_TOKENS", d.rate_limit_tokens),
            context_window_tokens: parse("CONTEXT_WINDOW_TOKENS", d.context_window_tokens),
            reserved_completion_tokens: parse(
                "RESERVED_COMPLETION_TOKENS",
                d.reserved_completion_tokens,
            ),
            call_timeout: d.call_timeout,
        }
    }
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> T {
    match std::env::var(k) {
        Ok(v) => v.trim().parse().unwrap_or_else(|_| {
            warn!(var = k, value = %v, "ignoring malformed value, using default");
            dflt
        }),
        Err(_) => dflt,
    }
}
