//! Scripted [`ChatCompletion`] double for pipeline and HTTP tests.

use std::sync::Mutex;

use futures::future::BoxFuture;

use crate::chat::{ChatCompletion, ChatMessage};
use crate::error_handler::{AiLlmError, Provider, ProviderError, ProviderErrorKind};

/// Replies with a fixed answer (or fails) and remembers every request.
#[derive(Debug, Default)]
pub struct ScriptedChat {
    reply: String,
    fail: bool,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Messages of the most recent request, if any.
    pub fn last_request(&self) -> Option<Vec<ChatMessage>> {
        self.calls.lock().ok().and_then(|c| c.last().cloned())
    }
}

impl ChatCompletion for ScriptedChat {
    fn complete<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<String, AiLlmError>> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(messages.to_vec());
            }
            if self.fail {
                return Err(ProviderError::new(
                    Provider::OpenAI,
                    ProviderErrorKind::Decode("scripted failure".into()),
                )
                .into());
            }
            Ok(self.reply.clone())
        })
    }
}
