//! Uploaded-file storage for the chat backend.
//!
//! [`FileCatalog`] is the only write path: it persists [`FileRecord`]s in a
//! [`RecordStore`] (SQLite in production) and keeps one vector per record in
//! the [`rag_store::VectorIndex`]. Every record write queues its vector task in
//! the same transaction; the task is cleared once the vector step succeeds and
//! otherwise retried by the worker in [`reindex`].

mod catalog;
mod config;
mod errors;
pub mod extract;
mod progress;
mod record;
pub mod reindex;
mod sqlite;
mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::FileCatalog;
pub use config::{FileStoreConfig, ReindexConfig};
pub use errors::FileStoreError;
pub use progress::{IndicatifProgress, NoopProgress, Progress};
pub use record::{FileDraft, FileRecord, FileUpload, ReindexOp, ReindexTask, Staged, StoreStats};
pub use sqlite::SqliteRecordStore;
pub use store::RecordStore;
