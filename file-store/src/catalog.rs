//! File catalog: every mutation of a file goes through here so the record
//! store and the vector index stay in step.
//!
//! Writes are two steps. The record is committed together with a queued
//! re-index task, then its vector is embedded and upserted (or removed) and
//! the task is cleared. When the vector step fails, or the store reply misses
//! its deadline, the task stays queued and the re-index worker finishes the
//! job later. Mutations of the same id are serialized by a striped lock.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rag_store::{EmbeddingsProvider, VectorEntry, VectorIndex};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::errors::FileStoreError;
use crate::record::{FileRecord, FileUpload, ReindexOp, Staged};
use crate::store::RecordStore;

const LOCK_STRIPES: usize = 64;

/// Awaits `fut` for at most `after`.
pub(crate) async fn bounded<T, E, F>(
    op: &'static str,
    after: Duration,
    fut: F,
) -> Result<T, FileStoreError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<FileStoreError>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(res) => res.map_err(Into::into),
        Err(_) => Err(FileStoreError::Timeout { op, after }),
    }
}

pub struct FileCatalog {
    store: Arc<dyn RecordStore>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingsProvider>,
    call_timeout: Duration,
    stripes: Vec<Mutex<()>>,
}

impl FileCatalog {
    pub fn new(
        store: Arc<dyn RecordStore>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingsProvider>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            call_timeout,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    fn stripe(&self, id: i64) -> &Mutex<()> {
        &self.stripes[id.rem_euclid(LOCK_STRIPES as i64) as usize]
    }

    pub async fn list(&self) -> Result<Vec<FileRecord>, FileStoreError> {
        bounded("list files", self.call_timeout, self.store.list()).await
    }

    pub async fn get(&self, id: i64) -> Result<FileRecord, FileStoreError> {
        bounded("get file", self.call_timeout, self.store.get(id))
            .await?
            .ok_or(FileStoreError::NotFound(id))
    }

    /// Stores a new file and indexes it.
    ///
    /// A failed vector step does not fail the call; the queued task is left
    /// for the worker instead.
    #[instrument(skip_all, fields(size = upload.size))]
    pub async fn create(&self, upload: FileUpload) -> Result<FileRecord, FileStoreError> {
        let draft = upload.into_draft()?;
        let staged = bounded("insert file", self.call_timeout, self.store.insert(draft)).await?;

        let _guard = self.stripe(staged.value.id).lock().await;
        self.index_staged(&staged).await;

        info!(id = staged.value.id, size = staged.value.size, "file created");
        Ok(staged.value)
    }

    /// Replaces a file. Missing ids yield `NotFound` and leave the index untouched.
    #[instrument(skip_all, fields(id = id))]
    pub async fn update(&self, id: i64, upload: FileUpload) -> Result<FileRecord, FileStoreError> {
        let draft = upload.into_draft()?;
        let _guard = self.stripe(id).lock().await;

        let staged = bounded("update file", self.call_timeout, self.store.update(id, draft))
            .await?
            .ok_or(FileStoreError::NotFound(id))?;
        self.index_staged(&staged).await;

        info!(id, size = staged.value.size, "file updated");
        Ok(staged.value)
    }

    #[instrument(skip_all, fields(id = id))]
    pub async fn delete(&self, id: i64) -> Result<(), FileStoreError> {
        let _guard = self.stripe(id).lock().await;

        let ticket = bounded("delete file", self.call_timeout, self.store.delete(id))
            .await?
            .ok_or(FileStoreError::NotFound(id))?;
        let removed = self.remove_vector(id).await;
        self.settle(id, ticket, ReindexOp::Delete, removed).await;

        info!(id, "file deleted");
        Ok(())
    }

    /// Makes the index agree with the store for one id: upsert when the
    /// record exists, delete otherwise.
    pub async fn reconcile_id(&self, id: i64) -> Result<ReindexOp, FileStoreError> {
        let _guard = self.stripe(id).lock().await;
        match bounded("get file", self.call_timeout, self.store.get(id)).await? {
            Some(record) => {
                self.upsert_vector(&record).await?;
                Ok(ReindexOp::Upsert)
            }
            None => {
                self.remove_vector(id).await?;
                Ok(ReindexOp::Delete)
            }
        }
    }

    async fn upsert_vector(&self, record: &FileRecord) -> Result<(), FileStoreError> {
        let values = bounded(
            "embed file",
            self.call_timeout,
            self.embedder.embed(&record.processed_data),
        )
        .await?;
        let entry = VectorEntry::for_file(record.id, record.size, values);
        bounded("upsert vector", self.call_timeout, self.index.upsert(vec![entry])).await
    }

    async fn remove_vector(&self, id: i64) -> Result<(), FileStoreError> {
        let key = id.to_string();
        bounded("delete vector", self.call_timeout, self.index.delete_one(&key)).await
    }

    async fn index_staged(&self, staged: &Staged<FileRecord>) {
        let upserted = self.upsert_vector(&staged.value).await;
        self.settle(staged.value.id, staged.ticket, ReindexOp::Upsert, upserted).await;
    }

    /// Clears the queued task after a successful vector step, or records the
    /// failure on it for the worker.
    async fn settle(
        &self,
        id: i64,
        ticket: i64,
        op: ReindexOp,
        outcome: Result<(), FileStoreError>,
    ) {
        let t = self.call_timeout;
        let (what, recorded) = match outcome {
            Ok(()) => (
                "complete",
                bounded("complete reindex", t, self.store.complete_reindex(ticket)).await,
            ),
            Err(err) => {
                warn!(id, op = op.as_str(), error = %err, "vector step failed; left queued");
                let msg = err.to_string();
                (
                    "fail",
                    bounded("fail reindex", t, self.store.fail_reindex(ticket, &msg)).await,
                )
            }
        };
        if let Err(err) = recorded {
            // The task stays queued either way; the worker redoes it.
            error!(id, ticket, what, error = %err, "could not settle reindex task");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::reindex::drain_queue;
    use crate::sqlite::SqliteRecordStore;
    use crate::testing::CountingStore;
    use rag_store::testing::{HashEmbedder, MemoryIndex};

    pub(crate) struct Fixture {
        pub catalog: FileCatalog,
        pub store: Arc<SqliteRecordStore>,
        pub index: Arc<MemoryIndex>,
        pub embedder: Arc<HashEmbedder>,
    }

    pub(crate) fn fixture() -> Fixture {
        let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
        let index = Arc::new(MemoryIndex::new());
        let embedder = Arc::new(HashEmbedder::new(16));
        let catalog = FileCatalog::new(
            store.clone(),
            index.clone(),
            embedder.clone(),
            Duration::from_secs(5),
        );
        Fixture {
            catalog,
            store,
            index,
            embedder,
        }
    }

    fn upload(content: &str) -> FileUpload {
        FileUpload {
            content: content.into(),
            size: content.len() as u64,
            processed_data: None,
        }
    }

    #[tokio::test]
    async fn create_writes_record_and_vector() {
        let f = fixture();
        let sheet = FileUpload {
            size: 8,
            ..upload("A\tB\n1\t2")
        };
        let rec = f.catalog.create(sheet).await.unwrap();

        assert_eq!(rec.processed_data, "A\tB\n1\t2");
        assert_eq!(rec.size, 8);
        let entry = f.index.get(&rec.id.to_string()).unwrap();
        assert_eq!(entry.metadata["fileId"], rec.id);
        assert_eq!(entry.metadata["size"], 8);
        assert_eq!(entry.values, f.embedder.vector_for("A\tB\n1\t2"));
        assert!(f.store.pending_reindex(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_vector_step_keeps_record_and_queues_it() {
        let f = fixture();
        f.index.set_fail_writes(true);

        let rec = f.catalog.create(upload("x\ty")).await.unwrap();
        assert!(f.catalog.get(rec.id).await.is_ok());
        assert!(!f.index.contains(&rec.id.to_string()));

        let tasks = f.store.pending_reindex(10).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].file_id, rec.id);
        assert_eq!(tasks[0].op, ReindexOp::Upsert);
        assert_eq!(tasks[0].attempts, 1);
        assert!(tasks[0].last_error.is_some());
    }

    fn slow_ack_catalog() -> (FileCatalog, Arc<CountingStore>, Arc<MemoryIndex>) {
        let store = Arc::new(CountingStore::new().unwrap());
        let index = Arc::new(MemoryIndex::new());
        let catalog = FileCatalog::new(
            store.clone(),
            index.clone(),
            Arc::new(HashEmbedder::new(16)),
            Duration::from_millis(100),
        );
        (catalog, store, index)
    }

    #[tokio::test]
    async fn insert_acked_after_deadline_is_finished_by_worker() {
        let (catalog, store, index) = slow_ack_catalog();
        store.set_ack_delay(Duration::from_millis(300));

        let err = catalog.create(upload("slow\tack")).await.unwrap_err();
        assert!(matches!(err, FileStoreError::Timeout { op: "insert file", .. }));

        let rows = catalog.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        let id = rows[0].id;
        assert!(!index.contains(&id.to_string()));
        let tasks = store.pending_reindex(10).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].file_id, id);
        assert_eq!(tasks[0].op, ReindexOp::Upsert);

        store.set_ack_delay(Duration::ZERO);
        let report = drain_queue(&catalog, 10).await.unwrap();
        assert_eq!(report.synced, 1);
        assert!(index.contains(&id.to_string()));
        assert!(store.pending_reindex(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_acked_after_deadline_still_drops_vector() {
        let (catalog, store, index) = slow_ack_catalog();
        let rec = catalog.create(upload("short lived")).await.unwrap();
        assert!(index.contains(&rec.id.to_string()));

        store.set_ack_delay(Duration::from_millis(300));
        let err = catalog.delete(rec.id).await.unwrap_err();
        assert!(matches!(err, FileStoreError::Timeout { op: "delete file", .. }));
        assert!(index.contains(&rec.id.to_string()));

        store.set_ack_delay(Duration::ZERO);
        drain_queue(&catalog, 10).await.unwrap();
        assert!(catalog.list().await.unwrap().is_empty());
        assert!(!index.contains(&rec.id.to_string()));
        assert!(store.pending_reindex(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_file_touches_nothing() {
        let f = fixture();
        let err = f.catalog.update(999, upload("new")).await.unwrap_err();
        assert!(matches!(err, FileStoreError::NotFound(999)));
        assert_eq!(f.index.upsert_calls(), 0);
        assert_eq!(f.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn update_replaces_vector() {
        let f = fixture();
        let rec = f.catalog.create(upload("old")).await.unwrap();
        f.catalog.update(rec.id, upload("brand new")).await.unwrap();

        let entry = f.index.get(&rec.id.to_string()).unwrap();
        assert_eq!(entry.values, f.embedder.vector_for("brand new"));
        assert_eq!(entry.metadata["size"], 9);
    }

    #[tokio::test]
    async fn delete_removes_record_and_vector() {
        let f = fixture();
        let rec = f.catalog.create(upload("gone soon")).await.unwrap();
        f.catalog.delete(rec.id).await.unwrap();

        assert!(matches!(
            f.catalog.get(rec.id).await,
            Err(FileStoreError::NotFound(_))
        ));
        assert!(!f.index.contains(&rec.id.to_string()));
        assert!(matches!(
            f.catalog.delete(rec.id).await,
            Err(FileStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_vector_delete_is_queued() {
        let f = fixture();
        let rec = f.catalog.create(upload("keep?")).await.unwrap();
        f.index.set_fail_writes(true);
        f.catalog.delete(rec.id).await.unwrap();

        let tasks = f.store.pending_reindex(10).await.unwrap();
        assert_eq!(tasks[0].op, ReindexOp::Delete);
        assert!(f.index.contains(&rec.id.to_string()));

        f.index.set_fail_writes(false);
        assert_eq!(f.catalog.reconcile_id(rec.id).await.unwrap(), ReindexOp::Delete);
        assert!(!f.index.contains(&rec.id.to_string()));
    }

    #[tokio::test]
    async fn concurrent_updates_leave_store_and_index_agreeing() {
        let f = Arc::new(fixture());
        let rec = f.catalog.create(upload("v0")).await.unwrap();

        let mut handles = Vec::new();
        for i in 1..=8 {
            let f = f.clone();
            handles.push(tokio::spawn(async move {
                f.catalog
                    .update(rec.id, upload(&format!("version {i}")))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let stored = f.catalog.get(rec.id).await.unwrap();
        let entry = f.index.get(&rec.id.to_string()).unwrap();
        assert_eq!(entry.values, f.embedder.vector_for(&stored.processed_data));
    }
}
