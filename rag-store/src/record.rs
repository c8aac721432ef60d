//! Point models exchanged with the vector index.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::RagError;

/// Point written to the index. `id` is the decimal string of the file id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Value,
}

impl VectorEntry {
    /// Entry for an uploaded file, carrying `{fileId, size}` as metadata.
    pub fn for_file(file_id: i64, size: u64, values: Vec<f32>) -> Self {
        Self {
            id: file_id.to_string(),
            values,
            metadata: json!({ "fileId": file_id, "size": size }),
        }
    }
}

/// One nearest-neighbour hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Option<Value>,
}

/// Parses a point id into the numeric form Qdrant stores.
pub fn numeric_point_id(id: &str) -> Result<u64, RagError> {
    id.trim()
        .parse::<u64>()
        .map_err(|_| RagError::InvalidId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_entry_carries_id_and_size() {
        let e = VectorEntry::for_file(7, 8, vec![0.5; 3]);
        assert_eq!(e.id, "7");
        assert_eq!(e.metadata["fileId"], 7);
        assert_eq!(e.metadata["size"], 8);
    }

    #[test]
    fn point_ids_must_be_numeric() {
        assert_eq!(numeric_point_id("42").unwrap(), 42);
        assert!(matches!(numeric_point_id("abc"), Err(RagError::InvalidId(_))));
        assert!(numeric_point_id("-1").is_err());
    }
}
