//! Vector index seam used by the file catalog and the context assembler.

use futures::future::BoxFuture;

use crate::errors::RagError;
use crate::record::{VectorEntry, VectorMatch};

/// Nearest-neighbour index keyed by string ids.
///
/// Implementations must make `upsert` and `delete_one` visible to the next
/// `query` once the returned future resolves.
pub trait VectorIndex: Send + Sync {
    /// Top-`top_k` matches for `vector`, best first.
    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        top_k: u64,
        include_metadata: bool,
    ) -> BoxFuture<'a, Result<Vec<VectorMatch>, RagError>>;

    fn upsert<'a>(&'a self, entries: Vec<VectorEntry>) -> BoxFuture<'a, Result<(), RagError>>;

    /// Removes one point. Deleting an absent id is not an error.
    fn delete_one<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), RagError>>;

    /// Every id currently stored, in no particular order.
    fn list_ids(&self) -> BoxFuture<'_, Result<Vec<String>, RagError>>;
}
