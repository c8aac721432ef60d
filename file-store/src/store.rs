//! Relational store seam.

use futures::future::BoxFuture;

use crate::errors::FileStoreError;
use crate::record::{FileDraft, FileRecord, ReindexTask, Staged, StoreStats};

type StoreResult<'a, T> = BoxFuture<'a, Result<T, FileStoreError>>;

/// Durable storage for file records and the re-index queue.
///
/// Every mutation commits the row change together with the re-index task it
/// implies (upsert for insert/update, delete for delete), replacing any older
/// task for the same id.
pub trait RecordStore: Send + Sync {
    /// All records, ascending by id.
    fn list(&self) -> StoreResult<'_, Vec<FileRecord>>;

    fn get(&self, id: i64) -> StoreResult<'_, Option<FileRecord>>;

    /// Records whose id is in `ids`; unknown ids are skipped. Order is unspecified.
    fn get_many<'a>(&'a self, ids: &'a [i64]) -> StoreResult<'a, Vec<FileRecord>>;

    /// Inserts and returns the record with its assigned id.
    fn insert(&self, draft: FileDraft) -> StoreResult<'_, Staged<FileRecord>>;

    /// Replaces the record wholesale; `None` when `id` does not exist.
    fn update(&self, id: i64, draft: FileDraft) -> StoreResult<'_, Option<Staged<FileRecord>>>;

    /// Ticket of the queued delete task; `None` when no row was removed.
    fn delete(&self, id: i64) -> StoreResult<'_, Option<i64>>;

    /// Oldest tasks first.
    fn pending_reindex(&self, limit: usize) -> StoreResult<'_, Vec<ReindexTask>>;

    /// Drops the task; a no-op once the ticket has been replaced.
    fn complete_reindex(&self, ticket: i64) -> StoreResult<'_, ()>;

    /// Records a failed attempt and moves the task to the back of the queue.
    fn fail_reindex<'a>(&'a self, ticket: i64, error: &'a str) -> StoreResult<'a, ()>;

    fn stats(&self) -> StoreResult<'_, StoreStats>;
}
