//! Runtime and collection configuration.

use std::time::Duration;

use crate::errors::RagError;

pub const DEFAULT_QDRANT_URL: &str = "http://127.0.0.1:6334";
pub const DEFAULT_COLLECTION: &str = "bizai-files";
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (recommended for most embeddings).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

impl std::str::FromStr for DistanceKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceKind::Cosine),
            "dot" => Ok(DistanceKind::Dot),
            "euclid" | "euclidean" => Ok(DistanceKind::Euclid),
            other => Err(RagError::Config(format!("unknown distance {other:?}"))),
        }
    }
}

/// Describes the vector space of the collection.
#[derive(Clone, Debug)]
pub struct VectorSpace {
    /// Dimensionality of vectors.
    pub size: usize,
    /// Distance function.
    pub distance: DistanceKind,
}

/// Connection and collection settings for the vector index.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Target collection name.
    pub collection: String,
    /// Distance function (Cosine by default).
    pub distance: DistanceKind,
    /// Embedding dimension the collection is created with.
    pub dim: usize,
    /// Per-call client timeout.
    pub timeout: Duration,
}

impl RagConfig {
    /// Creates a default config for a given collection name and Qdrant endpoint.
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            distance: DistanceKind::Cosine,
            dim: DEFAULT_EMBEDDING_DIM,
            timeout: Duration::from_secs(10),
        }
    }

    /// Reads `QDRANT_URL`, `QDRANT_API_KEY`, `QDRANT_COLLECTION`, `QDRANT_DISTANCE`,
    /// `QDRANT_TIMEOUT_SECS` and `EMBEDDING_DIM`.
    ///
    /// # Errors
    /// Malformed numbers or distance names, or a config rejected by [`RagConfig::validate`].
    pub fn from_env() -> Result<Self, RagError> {
        let cfg = Self {
            qdrant_url: env("QDRANT_URL", DEFAULT_QDRANT_URL),
            qdrant_api_key: std::env::var("QDRANT_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            collection: env("QDRANT_COLLECTION", DEFAULT_COLLECTION),
            distance: env("QDRANT_DISTANCE", "cosine").parse()?,
            dim: parse("EMBEDDING_DIM", DEFAULT_EMBEDDING_DIM)?,
            timeout: Duration::from_secs(parse("QDRANT_TIMEOUT_SECS", 10u64)?),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn space(&self) -> VectorSpace {
        VectorSpace {
            size: self.dim,
            distance: self.distance,
        }
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.qdrant_url.trim().is_empty() {
            return Err(RagError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("collection is empty".into()));
        }
        if self.dim == 0 {
            return Err(RagError::Config("dim must be > 0".into()));
        }
        Ok(())
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| dflt.to_string())
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> Result<T, RagError> {
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| RagError::Config(format!("{k} is not a valid number: {v:?}"))),
        _ => Ok(dflt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = RagConfig::new_default(DEFAULT_QDRANT_URL, DEFAULT_COLLECTION);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.space().size, 384);
        assert_eq!(cfg.distance, DistanceKind::Cosine);
    }

    #[test]
    fn empty_collection_is_rejected() {
        let cfg = RagConfig::new_default(DEFAULT_QDRANT_URL, " ");
        assert!(matches!(cfg.validate(), Err(RagError::Config(_))));
    }

    #[test]
    fn distance_names_parse() {
        assert_eq!("Euclidean".parse::<DistanceKind>().unwrap(), DistanceKind::Euclid);
        assert!("manhattan".parse::<DistanceKind>().is_err());
    }
}
