//! Chat message model shared by the providers and their callers.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error_handler::AiLlmError;

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One `{role, content}` turn. Unknown JSON fields are ignored on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Non-streaming chat completion.
///
/// The implementor owns the sampling knobs (`max_tokens`, `temperature`);
/// callers only pass the full message list and receive the first choice.
pub trait ChatCompletion: Send + Sync {
    fn complete<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<String, AiLlmError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_fields_are_dropped_and_content_defaults() {
        let raw = r#"[{"role":"user","content":"hi","id":"x1","createdAt":3},{"role":"assistant"}]"#;
        let turns: Vec<ChatMessage> = serde_json::from_str(raw).unwrap();
        assert_eq!(turns[0], ChatMessage::user("hi"));
        assert_eq!(turns[1], ChatMessage::assistant(""));

        let out = serde_json::to_value(&turns[0]).unwrap();
        assert_eq!(out, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let raw = r#"{"role":"tool","content":"x"}"#;
        assert!(serde_json::from_str::<ChatMessage>(raw).is_err());
    }
}
