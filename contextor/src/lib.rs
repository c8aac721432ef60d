//! Retrieval-augmented chat over uploaded sheets.
//!
//! [`ContextAssembler`] embeds the query, searches the vector index and
//! hydrates the matching files into a token-budgeted context string.
//! [`ChatPipeline`] wraps that context in a system prompt, checks the request
//! against the rate limit and the context window, and forwards it to the
//! completion API.

pub mod budget;
mod cfg;
mod chat;
mod deadline;
mod error;
pub mod prompt;
mod retrieve;

pub use ai_llm_service::chat::{ChatMessage as ChatTurn, ChatRole};
pub use cfg::ContextorConfig;
pub use chat::{ChatPipeline, ChatReply};
pub use error::{BudgetLimit, ContextorError};
pub use retrieve::{AssembledContext, ContextAssembler, RetrievedFile, render_context};
