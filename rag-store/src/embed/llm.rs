//! Embedding provider backed by the shared LLM service profiles.

use std::sync::Arc;

use ai_llm_service::service_profiles::LlmServiceProfiles;
use tracing::warn;

use crate::{EmbeddingsProvider, RagError};

/// Embeds text with the **embedding** profile and checks the dimension.
#[derive(Clone)]
pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
    dim: usize,
}

impl LlmEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: usize) -> Self {
        Self { svc, dim }
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>
    {
        Box::pin(async move {
            let resp = self.svc.embed(text).await?;

            if resp.len() != self.dim {
                warn!(got = resp.len(), want = self.dim, "embedding dimension mismatch");
                return Err(RagError::VectorSizeMismatch {
                    got: resp.len(),
                    want: self.dim,
                });
            }

            Ok(resp)
        })
    }
}
