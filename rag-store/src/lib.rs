//! Vector side of the file catalog: embeddings in, nearest neighbours out.
//!
//! - [`EmbeddingsProvider`] turns text into fixed-size vectors
//! - [`VectorIndex`] stores one point per uploaded file and answers top-K queries
//! - [`QdrantFacade`] is the production index

mod config;
mod embed;
mod errors;
mod index;
mod qdrant_facade;
mod record;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{
    DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIM, DEFAULT_QDRANT_URL, DistanceKind, RagConfig,
    VectorSpace,
};
pub use embed::EmbeddingsProvider;
pub use embed::llm::LlmEmbedder;
pub use errors::RagError;
pub use index::VectorIndex;
pub use qdrant_facade::QdrantFacade;
pub use record::{VectorEntry, VectorMatch, numeric_point_id};
