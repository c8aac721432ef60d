//! Context assembly: embed the query, find the nearest files, hydrate them
//! from the record store and render a budgeted context string.

use std::collections::HashMap;
use std::sync::Arc;

use file_store::RecordStore;
use rag_store::{EmbeddingsProvider, VectorIndex};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::budget::{estimate_tokens, truncate_text};
use crate::cfg::ContextorConfig;
use crate::deadline::within;
use crate::error::ContextorError;

/// One file picked for the context, with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedFile {
    pub id: i64,
    pub content: String,
    pub processed_data: String,
    pub score: f32,
}

/// Rendered context plus the number of files it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    pub file_count: usize,
}

pub struct ContextAssembler {
    embedder: Arc<dyn EmbeddingsProvider>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn RecordStore>,
    cfg: ContextorConfig,
}

impl ContextAssembler {
    pub fn new(
        embedder: Arc<dyn EmbeddingsProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn RecordStore>,
        cfg: ContextorConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
            cfg,
        }
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    /// Files most similar to `query`, best first.
    ///
    /// No fallback: a failed embedding or search aborts the call. The record
    /// store is not queried when the index returns no matches.
    pub async fn retrieve_relevant(
        &self,
        query: &str,
        top_k: u64,
    ) -> Result<Vec<RetrievedFile>, ContextorError> {
        let t = self.cfg.call_timeout;
        let vector = within(
            "embed query",
            t,
            self.embedder.embed(query),
            ContextorError::Embedding,
        )
        .await?;

        let matches = within(
            "vector search",
            t,
            self.index.query(&vector, top_k, true),
            ContextorError::VectorSearch,
        )
        .await?;
        if matches.is_empty() {
            debug!("no vector matches");
            return Ok(Vec::new());
        }

        let scores: HashMap<String, f32> =
            matches.iter().map(|m| (m.id.clone(), m.score)).collect();
        let ids: Vec<i64> = matches
            .iter()
            .filter_map(|m| match m.id.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(id = %m.id, "skipping match with non-numeric id");
                    None
                }
            })
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = within(
            "record lookup",
            t,
            self.store.get_many(&ids),
            ContextorError::RecordStore,
        )
        .await?;

        let mut files: Vec<RetrievedFile> = records
            .into_iter()
            .map(|r| RetrievedFile {
                score: scores.get(&r.id.to_string()).copied().unwrap_or(0.0),
                id: r.id,
                content: r.content,
                processed_data: r.processed_data,
            })
            .collect();
        files.sort_by(|a, b| b.score.total_cmp(&a.score));

        if files.len() < ids.len() {
            // Index ahead of the store; the re-index worker cleans these up.
            warn!(matched = ids.len(), found = files.len(), "vector ids without records");
        }
        Ok(files)
    }

    /// Retrieves and renders the context string for `query`.
    pub async fn assemble(
        &self,
        query: &str,
        top_k: u64,
    ) -> Result<AssembledContext, ContextorError> {
        let files = self.retrieve_relevant(query, top_k).await?;
        let text = render_context(&files, self.cfg.per_file_tokens, self.cfg.context_tokens);
        info!(
            files = files.len(),
            context_tokens = estimate_tokens(&text),
            "context assembled"
        );
        Ok(AssembledContext {
            text,
            file_count: files.len(),
        })
    }
}

/// Renders `File ID / Content / Score` blocks separated by a blank line.
///
/// Each file's `processed_data` is cut to `per_file_tokens`, then the joined
/// string is cut to `context_tokens`.
pub fn render_context(
    files: &[RetrievedFile],
    per_file_tokens: usize,
    context_tokens: usize,
) -> String {
    let joined = files
        .iter()
        .map(|f| {
            format!(
                "File ID: {}\nContent: {}\nScore: {}",
                f.id,
                truncate_text(&f.processed_data, per_file_tokens),
                f.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    if estimate_tokens(&joined) > context_tokens {
        truncate_text(&joined, context_tokens)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::TRUNCATION_MARKER;
    use file_store::testing::CountingStore;
    use file_store::{FileCatalog, FileUpload};
    use rag_store::VectorEntry;
    use rag_store::testing::{HashEmbedder, MemoryIndex};
    use std::time::Duration;

    struct Fixture {
        assembler: ContextAssembler,
        catalog: FileCatalog,
        store: Arc<CountingStore>,
        index: Arc<MemoryIndex>,
        embedder: Arc<HashEmbedder>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(CountingStore::new().unwrap());
        let index = Arc::new(MemoryIndex::new());
        let embedder = Arc::new(HashEmbedder::new(32));
        let catalog = FileCatalog::new(
            store.clone(),
            index.clone(),
            embedder.clone(),
            Duration::from_secs(5),
        );
        let assembler = ContextAssembler::new(
            embedder.clone(),
            index.clone(),
            store.clone(),
            ContextorConfig::default(),
        );
        Fixture {
            assembler,
            catalog,
            store,
            index,
            embedder,
        }
    }

    fn file(id: i64, data: &str, score: f32) -> RetrievedFile {
        RetrievedFile {
            id,
            content: data.into(),
            processed_data: data.into(),
            score,
        }
    }

    #[tokio::test]
    async fn empty_index_gives_empty_context_without_store_call() {
        let f = fixture();
        let ctx = f.assembler.assemble("anything", 3).await.unwrap();
        assert_eq!(ctx, AssembledContext::default());
        assert_eq!(f.store.get_many_calls(), 0);
    }

    #[tokio::test]
    async fn uploaded_sheet_renders_as_labeled_block() {
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

        let files = f.assembler.retrieve_relevant("1 and 2", 3).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, rec.id);

        let ctx = f.assembler.assemble("1 and 2", 3).await.unwrap();
        assert_eq!(ctx.file_count, 1);
        assert_eq!(
            ctx.text,
            format!("File ID: {}\nContent: A\tB\n1\t2\nScore: {}", rec.id, files[0].score)
        );
    }

    #[tokio::test]
    async fn results_are_ordered_by_score() {
        let f = fixture();
        for text in ["north region sales", "south region sales", "payroll"] {
            f.catalog
                .create(FileUpload {
                    content: text.into(),
                    size: text.len() as u64,
                    processed_data: None,
                })
                .await
                .unwrap();
        }
        let files = f.assembler.retrieve_relevant("region sales", 3).await.unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(f.store.get_many_calls(), 1);
    }

    #[tokio::test]
    async fn deleted_file_drops_out_of_retrieval() {
        let f = fixture();
        let mut ids = Vec::new();
        for text in ["north region sales", "south region sales"] {
            let rec = f
                .catalog
                .create(FileUpload {
                    content: text.into(),
                    size: text.len() as u64,
                    processed_data: None,
                })
                .await
                .unwrap();
            ids.push(rec.id);
        }
        let gone = ids[0];

        let before = f.assembler.retrieve_relevant("north region sales", 3).await.unwrap();
        assert!(before.iter().any(|r| r.id == gone));

        f.catalog.delete(gone).await.unwrap();

        let after = f.assembler.retrieve_relevant("north region sales", 3).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, ids[1]);
        assert!(!f.store.last_get_many_ids().contains(&gone));
    }

    #[tokio::test]
    async fn non_numeric_match_ids_are_skipped() {
        let f = fixture();
        f.index
            .upsert(vec![VectorEntry {
                id: "not-a-file".into(),
                values: f.embedder.vector_for("q"),
                metadata: serde_json::Value::Null,
            }])
            .await
            .unwrap();

        let files = f.assembler.retrieve_relevant("q", 3).await.unwrap();
        assert!(files.is_empty());
        assert_eq!(f.store.get_many_calls(), 0);
    }

    #[tokio::test]
    async fn embedding_failure_aborts_retrieval() {
        let f = fixture();
        f.embedder.set_failing(true);
        let err = f.assembler.assemble("q", 3).await.unwrap_err();
        assert!(matches!(err, ContextorError::Embedding(_)));
        assert_eq!(f.index.query_calls(), 0);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_record_error() {
        let f = fixture();
        f.catalog
            .create(FileUpload {
                content: "x".into(),
                size: 1,
                processed_data: None,
            })
            .await
            .unwrap();
        f.store.set_fail_reads(true);
        let err = f.assembler.assemble("x", 3).await.unwrap_err();
        assert!(matches!(err, ContextorError::RecordStore(_)));
    }

    #[test]
    fn per_file_budget_cuts_each_block() {
        let long = "x".repeat(50);
        let out = render_context(&[file(1, &long, 0.5)], 2, 4000);
        assert_eq!(out, format!("File ID: 1\nContent: xxxxxxxx{TRUNCATION_MARKER}\nScore: 0.5"));
    }

    #[test]
    fn global_budget_cuts_joined_string() {
        let files = vec![file(1, &"a".repeat(40), 0.9), file(2, &"b".repeat(40), 0.8)];
        let out = render_context(&files, 1000, 10);
        assert!(out.starts_with("File ID: 1\nContent: aaaa"));
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert_eq!(out.chars().count(), 40 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn blocks_are_separated_by_blank_line() {
        let out = render_context(&[file(1, "a", 0.9), file(2, "b", 0.0)], 1000, 4000);
        assert_eq!(out, "File ID: 1\nContent: a\nScore: 0.9\n\nFile ID: 2\nContent: b\nScore: 0");
    }
}
