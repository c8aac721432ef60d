//! Thin adapter around `qdrant-client` implementing [`VectorIndex`].
//!
//! All Qdrant builder calls live here; the rest of the workspace only sees
//! string ids, `f32` vectors and JSON metadata. Point ids are stored as
//! unsigned integers, so every id passed in must be a decimal number.

use std::collections::HashMap;

use futures::future::BoxFuture;
use qdrant_client::{Payload, Qdrant};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId, PointStruct,
    PointsIdsList, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value as QValue,
    VectorParamsBuilder,
};
use tracing::{debug, info, warn};

use crate::config::{DistanceKind, RagConfig, VectorSpace};
use crate::errors::RagError;
use crate::index::VectorIndex;
use crate::record::{VectorEntry, VectorMatch, numeric_point_id};

const SCROLL_PAGE: u32 = 256;

/// Qdrant-backed vector index bound to one collection.
pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
    space: VectorSpace,
}

impl QdrantFacade {
    /// Builds the client. No network round-trip happens here.
    ///
    /// # Errors
    /// Returns `RagError::Config` for invalid settings and `RagError::Qdrant`
    /// if the client cannot be constructed.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url).timeout(cfg.timeout);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            space: cfg.space(),
        })
    }

    /// Creates the collection when it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<(), RagError> {
        match self.client.collection_info(&self.collection).await {
            Ok(_) => {
                debug!(collection = %self.collection, "collection already exists");
                return Ok(());
            }
            Err(err) => {
                warn!(collection = %self.collection, error = %err, "collection not found, creating");
            }
        }

        let distance = match self.space.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        };

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(self.space.size as u64, distance)),
            )
            .await
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        info!(
            collection = %self.collection,
            size = self.space.size,
            distance = ?self.space.distance,
            "collection created"
        );
        Ok(())
    }

    fn to_point(&self, entry: VectorEntry) -> Result<PointStruct, RagError> {
        if entry.values.len() != self.space.size {
            return Err(RagError::VectorSizeMismatch {
                got: entry.values.len(),
                want: self.space.size,
            });
        }
        let id = numeric_point_id(&entry.id)?;
        let payload = if entry.metadata.is_null() {
            Payload::new()
        } else {
            Payload::try_from(entry.metadata).map_err(|e| RagError::Payload(e.to_string()))?
        };
        Ok(PointStruct::new(id, entry.values, payload))
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        include_metadata: bool,
    ) -> Result<Vec<VectorMatch>, RagError> {
        let res = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, top_k)
                    .with_payload(include_metadata),
            )
            .await
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        let out: Vec<VectorMatch> = res
            .result
            .into_iter()
            .filter_map(|p| {
                let id = point_id_to_string(p.id)?;
                let metadata = include_metadata.then(|| payload_to_json(p.payload));
                Some(VectorMatch {
                    id,
                    score: p.score,
                    metadata,
                })
            })
            .collect();

        debug!(collection = %self.collection, top_k, hits = out.len(), "search completed");
        Ok(out)
    }

    async fn upsert_entries(&self, entries: Vec<VectorEntry>) -> Result<(), RagError> {
        if entries.is_empty() {
            return Ok(());
        }
        let points = entries
            .into_iter()
            .map(|e| self.to_point(e))
            .collect::<Result<Vec<_>, _>>()?;
        let count = points.len();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        debug!(collection = %self.collection, count, "points upserted");
        Ok(())
    }

    async fn delete_point(&self, id: &str) -> Result<(), RagError> {
        let numeric = numeric_point_id(id)?;
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(PointsIdsList {
                        ids: vec![PointId::from(numeric)],
                    })
                    .wait(true),
            )
            .await
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        debug!(collection = %self.collection, id, "point deleted");
        Ok(())
    }

    async fn scroll_ids(&self) -> Result<Vec<String>, RagError> {
        let mut ids = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut req = ScrollPointsBuilder::new(&self.collection)
                .limit(SCROLL_PAGE)
                .with_payload(false)
                .with_vectors(false);
            if let Some(o) = offset.take() {
                req = req.offset(o);
            }

            let page = self
                .client
                .scroll(req)
                .await
                .map_err(|e| RagError::Qdrant(e.to_string()))?;

            ids.extend(page.result.into_iter().filter_map(|p| point_id_to_string(p.id)));

            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(ids)
    }
}

impl VectorIndex for QdrantFacade {
    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        top_k: u64,
        include_metadata: bool,
    ) -> BoxFuture<'a, Result<Vec<VectorMatch>, RagError>> {
        Box::pin(self.search(vector.to_vec(), top_k, include_metadata))
    }

    fn upsert<'a>(&'a self, entries: Vec<VectorEntry>) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(self.upsert_entries(entries))
    }

    fn delete_one<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(self.delete_point(id))
    }

    fn list_ids(&self) -> BoxFuture<'_, Result<Vec<String>, RagError>> {
        Box::pin(self.scroll_ids())
    }
}

fn point_id_to_string(id: Option<PointId>) -> Option<String> {
    match id?.point_id_options? {
        PointIdOptions::Num(n) => Some(n.to_string()),
        PointIdOptions::Uuid(u) => Some(u),
    }
}

/// Converts a Qdrant payload into a JSON object.
fn payload_to_json(payload: HashMap<String, QValue>) -> serde_json::Value {
    serde_json::Value::Object(
        payload
            .into_iter()
            .map(|(k, v)| (k, qvalue_to_json(v)))
            .collect(),
    )
}

fn qvalue_to_json(v: QValue) -> serde_json::Value {
    match v.kind {
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::IntegerValue(i)) => serde_json::Value::from(i),
        Some(Kind::DoubleValue(f)) => serde_json::json!(f),
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(qvalue_to_json).collect())
        }
        Some(Kind::StructValue(s)) => payload_to_json(s.fields),
        Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_uuid_ids_round_to_strings() {
        assert_eq!(point_id_to_string(Some(PointId::from(12u64))).as_deref(), Some("12"));
        assert_eq!(point_id_to_string(None), None);
    }

    #[test]
    fn payload_scalars_map_to_json() {
        let mut p = HashMap::new();
        p.insert("fileId".to_string(), QValue::from(3i64));
        p.insert("name".to_string(), QValue::from("sheet".to_string()));
        let j = payload_to_json(p);
        assert_eq!(j["fileId"], 3);
        assert_eq!(j["name"], "sheet");
    }

    #[test]
    fn wrong_dimension_is_rejected_before_any_call() {
        let cfg = RagConfig::new_default("http://127.0.0.1:6334", "bizai-files");
        let facade = QdrantFacade::new(&cfg).unwrap();
        let err = facade
            .to_point(VectorEntry::for_file(1, 8, vec![0.0; 3]))
            .unwrap_err();
        assert!(matches!(err, RagError::VectorSizeMismatch { got: 3, want: 384 }));
    }
}
