//! Chat pipeline: context, system prompt, token budget, completion.

use std::sync::Arc;

use ai_llm_service::chat::{ChatCompletion, ChatMessage};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::budget::estimate_tokens;
use crate::deadline::within;
use crate::error::{BudgetLimit, ContextorError};
use crate::prompt::build_system_prompt;
use crate::retrieve::ContextAssembler;

/// Answer plus the bookkeeping the pipeline did to produce it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub context_files: usize,
    pub total_tokens: usize,
}

pub struct ChatPipeline {
    assembler: ContextAssembler,
    completion: Arc<dyn ChatCompletion>,
}

impl ChatPipeline {
    pub fn new(assembler: ContextAssembler, completion: Arc<dyn ChatCompletion>) -> Self {
        Self {
            assembler,
            completion,
        }
    }

    /// Answers the last turn of `conversation`.
    ///
    /// The completion API is only called when the estimated request fits both
    /// the rate limit and the context window. Nothing is retried.
    #[instrument(skip_all, fields(turns = conversation.len()))]
    pub async fn respond(&self, conversation: &[ChatMessage]) -> Result<ChatReply, ContextorError> {
        let query = match conversation.last() {
            None => return Err(ContextorError::Validation("conversation is empty".into())),
            Some(turn) if turn.content.trim().is_empty() => {
                return Err(ContextorError::Validation("last message has no content".into()));
            }
            Some(turn) => turn.content.as_str(),
        };

        let cfg = self.assembler.config();
        let context = self.assembler.assemble(query, cfg.top_k).await?;

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(ChatMessage::system(build_system_prompt(&context.text)));
        messages.extend(
            conversation
                .iter()
                .map(|t| ChatMessage::new(t.role, t.content.clone())),
        );

        let total = messages
            .iter()
            .map(|m| estimate_tokens(&m.content))
            .sum::<usize>()
            + cfg.reserved_completion_tokens;
        check_budget(total, cfg.rate_limit_tokens, cfg.context_window_tokens)?;

        let response = within(
            "completion",
            cfg.call_timeout,
            self.completion.complete(&messages),
            ContextorError::Completion,
        )
        .await?;

        info!(
            context_files = context.file_count,
            total_tokens = total,
            "chat answered"
        );
        Ok(ChatReply {
            response,
            context_files: context.file_count,
            total_tokens: total,
        })
    }
}

/// Rejects `total` above either limit, reporting the smaller limit it breaks.
fn check_budget(total: usize, rate_limit: usize, window: usize) -> Result<(), ContextorError> {
    let broken = [
        (rate_limit, BudgetLimit::RateLimit),
        (window, BudgetLimit::ContextWindow),
    ]
    .into_iter()
    .filter(|(limit, _)| total > *limit)
    .min_by_key(|(limit, _)| *limit);

    match broken {
        None => Ok(()),
        Some((limit, kind)) => {
            warn!(total, limit, %kind, "token budget exceeded");
            Err(ContextorError::BudgetExceeded { total, limit, kind })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::ContextorConfig;
    use ai_llm_service::chat::ChatRole;
    use ai_llm_service::testing::ScriptedChat;
    use file_store::testing::CountingStore;
    use file_store::{FileCatalog, FileUpload};
    use rag_store::testing::{HashEmbedder, MemoryIndex};
    use std::time::Duration;

    struct Fixture {
        pipeline: ChatPipeline,
        catalog: FileCatalog,
        chat: Arc<ScriptedChat>,
        store: Arc<CountingStore>,
    }

    fn fixture_with(cfg: ContextorConfig, chat: ScriptedChat) -> Fixture {
        let store = Arc::new(CountingStore::new().unwrap());
        let index = Arc::new(MemoryIndex::new());
        let embedder = Arc::new(HashEmbedder::new(32));
        let chat = Arc::new(chat);
        let catalog = FileCatalog::new(
            store.clone(),
            index.clone(),
            embedder.clone(),
            Duration::from_secs(5),
        );
        let assembler = ContextAssembler::new(embedder, index, store.clone(), cfg);
        Fixture {
            pipeline: ChatPipeline::new(assembler, chat.clone()),
            catalog,
            chat,
            store,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(ContextorConfig::default(), ScriptedChat::replying("42"))
    }

    #[tokio::test]
    async fn empty_conversation_is_rejected() {
        let f = fixture();
        let err = f.pipeline.respond(&[]).await.unwrap_err();
        assert!(matches!(err, ContextorError::Validation(_)));
        assert_eq!(f.chat.call_count(), 0);
    }

    #[tokio::test]
    async fn blank_last_turn_is_rejected() {
        let f = fixture();
        let turns = [ChatMessage::user("hello"), ChatMessage::user("   ")];
        let err = f.pipeline.respond(&turns).await.unwrap_err();
        assert!(matches!(err, ContextorError::Validation(_)));
        assert_eq!(f.store.get_many_calls(), 0);
    }

    #[tokio::test]
    async fn request_is_system_turn_then_conversation() {
        let f = fixture();
        let rec = f
            .catalog
            .create(FileUpload {
                content: "A\tB\n1\t2".into(),
                size: 8,
                processed_data: None,
            })
            .await
            .unwrap();

        let turns = [
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
            ChatMessage::user("what is in column B?"),
        ];
        let reply = f.pipeline.respond(&turns).await.unwrap();
        assert_eq!(reply.response, "42");
        assert_eq!(reply.context_files, 1);

        let sent = f.chat.last_request().unwrap();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].role, ChatRole::System);
        assert!(sent[0].content.contains(&format!("File ID: {}", rec.id)));
        assert_eq!(&sent[1..], &turns[..]);

        let expected: usize = sent.iter().map(|m| estimate_tokens(&m.content)).sum::<usize>() + 1000;
        assert_eq!(reply.total_tokens, expected);
    }

    #[tokio::test]
    async fn empty_index_still_answers() {
        let f = fixture();
        let reply = f.pipeline.respond(&[ChatMessage::user("hello")]).await.unwrap();
        assert_eq!(reply.context_files, 0);
        assert_eq!(f.store.get_many_calls(), 0);
        assert_eq!(f.chat.call_count(), 1);
    }

    #[tokio::test]
    async fn over_budget_conversation_never_reaches_completion() {
        let f = fixture();
        let long = "x".repeat(4 * 6000);
        let err = f.pipeline.respond(&[ChatMessage::user(long)]).await.unwrap_err();
        match err {
            ContextorError::BudgetExceeded { total, limit, kind } => {
                assert!(total > 6000);
                assert_eq!(limit, 6000);
                assert_eq!(kind, BudgetLimit::RateLimit);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(f.chat.call_count(), 0);
    }

    #[tokio::test]
    async fn completion_failure_is_surfaced() {
        let f = fixture_with(ContextorConfig::default(), ScriptedChat::failing());
        let err = f
            .pipeline
            .respond(&[ChatMessage::user("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, ContextorError::Completion(_)));
    }

    #[test]
    fn budget_reports_tightest_broken_limit() {
        assert!(check_budget(6000, 6000, 8192).is_ok());
        assert!(matches!(
            check_budget(7000, 6000, 8192),
            Err(ContextorError::BudgetExceeded { limit: 6000, kind: BudgetLimit::RateLimit, .. })
        ));
        assert!(matches!(
            check_budget(5000, 6000, 4096),
            Err(ContextorError::BudgetExceeded { limit: 4096, kind: BudgetLimit::ContextWindow, .. })
        ));
        assert!(matches!(
            check_budget(9000, 6000, 8192),
            Err(ContextorError::BudgetExceeded { limit: 6000, .. })
        ));
    }
}
