//! In-memory doubles for the embedding backend and the vector index.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::{EmbeddingsProvider, RagError, VectorEntry, VectorIndex, VectorMatch};

/// Deterministic bag-of-trigrams embedder. Equal texts map to equal vectors
/// and texts sharing trigrams score closer under cosine.
#[derive(Debug)]
pub struct HashEmbedder {
    dim: usize,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let chars: Vec<char> = text.to_lowercase().chars().collect();
        let mut v = vec![0f32; self.dim];
        for gram in chars.windows(3) {
            let mut h = DefaultHasher::new();
            gram.hash(&mut h);
            v[(h.finish() % self.dim as u64) as usize] += 1.0;
        }
        if chars.len() < 3 {
            v[0] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter_mut().for_each(|x| *x /= norm);
        v
    }
}

impl EmbeddingsProvider for HashEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>
    {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(RagError::Unavailable("embedder switched off".into()));
            }
            Ok(self.vector_for(text))
        })
    }
}

/// Cosine-scored index held in a map, with call counters and a failure switch.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    points: Mutex<BTreeMap<String, VectorEntry>>,
    fail_writes: AtomicBool,
    queries: AtomicUsize,
    upserts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `upsert` and `delete_one` fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.points.lock().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<VectorEntry> {
        self.points.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.points.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.lock().is_empty()
    }

    pub fn query_calls(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Successful upserted entries, counted per entry.
    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

impl VectorIndex for MemoryIndex {
    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        top_k: u64,
        include_metadata: bool,
    ) -> BoxFuture<'a, Result<Vec<VectorMatch>, RagError>> {
        Box::pin(async move {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let mut hits: Vec<VectorMatch> = self
                .points
                .lock()
                .values()
                .map(|e| VectorMatch {
                    id: e.id.clone(),
                    score: cosine(vector, &e.values),
                    metadata: include_metadata.then(|| e.metadata.clone()),
                })
                .collect();
            hits.sort_by(|a, b| b.score.total_cmp(&a.score));
            hits.truncate(top_k as usize);
            Ok(hits)
        })
    }

    fn upsert<'a>(&'a self, entries: Vec<VectorEntry>) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(RagError::Unavailable("index writes switched off".into()));
            }
            let mut points = self.points.lock();
            for e in entries {
                self.upserts.fetch_add(1, Ordering::SeqCst);
                points.insert(e.id.clone(), e);
            }
            Ok(())
        })
    }

    fn delete_one<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(RagError::Unavailable("index writes switched off".into()));
            }
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.points.lock().remove(id);
            Ok(())
        })
    }

    fn list_ids(&self) -> BoxFuture<'_, Result<Vec<String>, RagError>> {
        Box::pin(async move { Ok(self.points.lock().keys().cloned().collect()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closest_text_ranks_first() {
        let emb = HashEmbedder::new(64);
        let index = MemoryIndex::new();
        index
            .upsert(vec![
                VectorEntry::for_file(1, 3, emb.vector_for("revenue by quarter")),
                VectorEntry::for_file(2, 3, emb.vector_for("employee names")),
            ])
            .await
            .unwrap();

        let q = emb.embed("quarterly revenue").await.unwrap();
        let hits = index.query(&q, 1, true).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
        assert_eq!(hits[0].metadata.as_ref().unwrap()["fileId"], 1);
    }

    #[tokio::test]
    async fn failing_writes_leave_index_untouched() {
        let index = MemoryIndex::new();
        index.set_fail_writes(true);
        assert!(index.upsert(vec![VectorEntry::for_file(1, 1, vec![1.0])]).await.is_err());
        assert!(index.is_empty());
        assert_eq!(index.upsert_calls(), 0);
    }
}
