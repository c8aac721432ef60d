//! Store wrapper that counts reads, for asserting which calls a pipeline made.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::errors::FileStoreError;
use crate::record::{FileDraft, FileRecord, ReindexTask, Staged, StoreStats};
use crate::sqlite::SqliteRecordStore;
use crate::store::RecordStore;

type StoreResult<'a, T> = BoxFuture<'a, Result<T, FileStoreError>>;

/// In-memory SQLite store with read counters (and the ids last looked up), a
/// switch that fails lookups and an optional delay between a write committing
/// and its reply.
pub struct CountingStore {
    inner: SqliteRecordStore,
    get_many_calls: AtomicUsize,
    get_many_ids: Mutex<Vec<i64>>,
    fail_reads: AtomicBool,
    ack_delay_ms: AtomicU64,
}

impl CountingStore {
    pub fn new() -> Result<Self, FileStoreError> {
        Ok(Self {
            inner: SqliteRecordStore::open_in_memory()?,
            get_many_calls: AtomicUsize::new(0),
            get_many_ids: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            ack_delay_ms: AtomicU64::new(0),
        })
    }

    pub fn get_many_calls(&self) -> usize {
        self.get_many_calls.load(Ordering::SeqCst)
    }

    /// Ids handed to the latest `get_many`.
    pub fn last_get_many_ids(&self) -> Vec<i64> {
        self.get_many_ids.lock().clone()
    }

    /// Makes `get_many` fail until switched back.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Holds back the reply of `insert`, `update` and `delete` for `delay`
    /// after the write has committed.
    pub fn set_ack_delay(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.ack_delay_ms.store(ms, Ordering::SeqCst);
    }

    async fn acked<T>(&self, write: StoreResult<'_, T>) -> Result<T, FileStoreError> {
        let out = write.await;
        let ms = self.ack_delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        out
    }
}

impl RecordStore for CountingStore {
    fn list(&self) -> StoreResult<'_, Vec<FileRecord>> {
        self.inner.list()
    }

    fn get(&self, id: i64) -> StoreResult<'_, Option<FileRecord>> {
        self.inner.get(id)
    }

    fn get_many<'a>(&'a self, ids: &'a [i64]) -> StoreResult<'a, Vec<FileRecord>> {
        self.get_many_calls.fetch_add(1, Ordering::SeqCst);
        *self.get_many_ids.lock() = ids.to_vec();
        if self.fail_reads.load(Ordering::SeqCst) {
            return Box::pin(async { Err(FileStoreError::Config("reads switched off".into())) });
        }
        self.inner.get_many(ids)
    }

    fn insert(&self, draft: FileDraft) -> StoreResult<'_, Staged<FileRecord>> {
        Box::pin(self.acked(self.inner.insert(draft)))
    }

    fn update(&self, id: i64, draft: FileDraft) -> StoreResult<'_, Option<Staged<FileRecord>>> {
        Box::pin(self.acked(self.inner.update(id, draft)))
    }

    fn delete(&self, id: i64) -> StoreResult<'_, Option<i64>> {
        Box::pin(self.acked(self.inner.delete(id)))
    }

    fn pending_reindex(&self, limit: usize) -> StoreResult<'_, Vec<ReindexTask>> {
        self.inner.pending_reindex(limit)
    }

    fn complete_reindex(&self, ticket: i64) -> StoreResult<'_, ()> {
        self.inner.complete_reindex(ticket)
    }

    fn fail_reindex<'a>(&'a self, ticket: i64, error: &'a str) -> StoreResult<'a, ()> {
        self.inner.fail_reindex(ticket, error)
    }

    fn stats(&self) -> StoreResult<'_, StoreStats> {
        self.inner.stats()
    }
}
