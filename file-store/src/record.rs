//! File records and upload payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FileStoreError;
use crate::extract::sheet_text;

/// One uploaded sheet as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub content: String,
    pub size: u64,
    pub processed_data: String,
}

/// Client payload for create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct FileUpload {
    pub content: String,
    pub size: u64,
    #[serde(default)]
    pub processed_data: Option<String>,
}

impl FileUpload {
    /// Validates the payload and fills in `processed_data` when absent.
    pub fn into_draft(self) -> Result<FileDraft, FileStoreError> {
        if self.content.trim().is_empty() {
            return Err(FileStoreError::Validation("content must not be empty".into()));
        }
        if i64::try_from(self.size).is_err() {
            return Err(FileStoreError::Validation(format!(
                "size {} does not fit the store",
                self.size
            )));
        }
        let processed_data = match self.processed_data {
            Some(p) if !p.trim().is_empty() => p,
            _ => sheet_text(&self.content),
        };
        Ok(FileDraft {
            content: self.content,
            size: self.size,
            processed_data,
        })
    }
}

/// Validated record body, without an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDraft {
    pub content: String,
    pub size: u64,
    pub processed_data: String,
}

/// Vector-side change still owed for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReindexOp {
    Upsert,
    Delete,
}

impl ReindexOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReindexOp::Upsert => "upsert",
            ReindexOp::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upsert" => Some(ReindexOp::Upsert),
            "delete" => Some(ReindexOp::Delete),
            _ => None,
        }
    }
}

/// A committed store mutation plus the ticket of the re-index task written
/// in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged<T> {
    pub value: T,
    pub ticket: i64,
}

/// Pending entry of the re-index queue. At most one per file id.
///
/// `ticket` is never reused, so a task replaced by a newer one for the same
/// file cannot be completed or failed through a stale ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReindexTask {
    pub ticket: i64,
    pub file_id: i64,
    pub op: ReindexOp,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub queued_at: DateTime<Utc>,
}

/// Row counts reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub files: u64,
    pub pending_reindex: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_processed_data_is_derived() {
        let upload: FileUpload = serde_json::from_str(r#"{"content":"A\tB\n1\t2","size":8}"#).unwrap();
        let draft = upload.into_draft().unwrap();
        assert_eq!(draft.processed_data, "A\tB\n1\t2");
        assert_eq!(draft.size, 8);
    }

    #[test]
    fn explicit_processed_data_wins() {
        let upload = FileUpload {
            content: "raw".into(),
            size: 3,
            processed_data: Some("parsed".into()),
        };
        assert_eq!(upload.into_draft().unwrap().processed_data, "parsed");
    }

    #[test]
    fn blank_content_is_rejected() {
        let upload = FileUpload {
            content: "  \n".into(),
            size: 3,
            processed_data: None,
        };
        assert!(matches!(upload.into_draft(), Err(FileStoreError::Validation(_))));
    }

    #[test]
    fn oversized_size_is_rejected() {
        let upload = FileUpload {
            content: "x".into(),
            size: u64::MAX,
            processed_data: None,
        };
        assert!(upload.into_draft().is_err());
    }
}
