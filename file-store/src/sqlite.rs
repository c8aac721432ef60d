//! SQLite-backed [`RecordStore`].
//!
//! One connection guarded by a `parking_lot::Mutex`; every statement runs on
//! the blocking pool so request tasks never stall the runtime.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::{debug, info};

use crate::errors::FileStoreError;
use crate::record::{FileDraft, FileRecord, ReindexOp, ReindexTask, Staged, StoreStats};
use crate::store::RecordStore;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS files (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        content        TEXT    NOT NULL,
        size           INTEGER NOT NULL,
        processed_data TEXT    NOT NULL
    );

    CREATE TABLE IF NOT EXISTS index_queue (
        ticket     INTEGER PRIMARY KEY AUTOINCREMENT,
        file_id    INTEGER NOT NULL UNIQUE,
        op         TEXT    NOT NULL,
        attempts   INTEGER NOT NULL DEFAULT 0,
        last_error TEXT,
        queued_at  TEXT    NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_index_queue_queued ON index_queue(queued_at);
";

const SELECT_FILE: &str = "SELECT id, content, size, processed_data FROM files";

#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Opens (or creates) the database file and applies the schema.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, FileStoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| FileStoreError::Config(format!("cannot create {dir:?}: {e}")))?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %path.display(), "record store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Private in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, FileStoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, FileStoreError>
    where
        F: FnOnce(&Connection) -> Result<T, FileStoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await?
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        content: row.get(1)?,
        size: row.get::<_, i64>(2)?.max(0) as u64,
        processed_data: row.get(3)?,
    })
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<ReindexTask> {
    let op: String = row.get(2)?;
    Ok(ReindexTask {
        ticket: row.get(0)?,
        file_id: row.get(1)?,
        op: ReindexOp::parse(&op).unwrap_or(ReindexOp::Upsert),
        attempts: row.get(3)?,
        last_error: row.get(4)?,
        queued_at: row.get::<_, DateTime<Utc>>(5)?,
    })
}

/// Queues `op` for `id` inside the caller's transaction and returns its ticket.
/// An older task for the same id is replaced, and its ticket retired with it.
fn stage(c: &Connection, id: i64, op: ReindexOp) -> rusqlite::Result<i64> {
    c.execute("DELETE FROM index_queue WHERE file_id = ?1", params![id])?;
    c.execute(
        "INSERT INTO index_queue (file_id, op, queued_at) VALUES (?1, ?2, ?3)",
        params![id, op.as_str(), Utc::now()],
    )?;
    Ok(c.last_insert_rowid())
}

fn size_param(size: u64) -> Result<i64, FileStoreError> {
    i64::try_from(size).map_err(|_| FileStoreError::Validation(format!("size {size} too large")))
}

impl RecordStore for SqliteRecordStore {
    fn list(&self) -> BoxFuture<'_, Result<Vec<FileRecord>, FileStoreError>> {
        Box::pin(self.with_conn(|c| {
            let mut stmt = c.prepare(&format!("{SELECT_FILE} ORDER BY id"))?;
            let rows = stmt
                .query_map([], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        }))
    }

    fn get(&self, id: i64) -> BoxFuture<'_, Result<Option<FileRecord>, FileStoreError>> {
        Box::pin(self.with_conn(move |c| {
            let rec = c
                .query_row(&format!("{SELECT_FILE} WHERE id = ?1"), params![id], row_to_record)
                .optional()?;
            Ok(rec)
        }))
    }

    fn get_many<'a>(
        &'a self,
        ids: &'a [i64],
    ) -> BoxFuture<'a, Result<Vec<FileRecord>, FileStoreError>> {
        let ids = ids.to_vec();
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            self.with_conn(move |c| {
                let placeholders = vec!["?"; ids.len()].join(", ");
                let mut stmt = c.prepare(&format!("{SELECT_FILE} WHERE id IN ({placeholders})"))?;
                let rows = stmt
                    .query_map(params_from_iter(ids.iter()), row_to_record)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
        })
    }

    fn insert(
        &self,
        draft: FileDraft,
    ) -> BoxFuture<'_, Result<Staged<FileRecord>, FileStoreError>> {
        Box::pin(self.with_conn(move |c| {
            let tx = c.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO files (content, size, processed_data) VALUES (?1, ?2, ?3)",
                params![draft.content, size_param(draft.size)?, draft.processed_data],
            )?;
            let id = tx.last_insert_rowid();
            let ticket = stage(&tx, id, ReindexOp::Upsert)?;
            tx.commit()?;

            debug!(id, ticket, "file row inserted");
            Ok(Staged {
                value: FileRecord {
                    id,
                    content: draft.content,
                    size: draft.size,
                    processed_data: draft.processed_data,
                },
                ticket,
            })
        }))
    }

    fn update(
        &self,
        id: i64,
        draft: FileDraft,
    ) -> BoxFuture<'_, Result<Option<Staged<FileRecord>>, FileStoreError>> {
        Box::pin(self.with_conn(move |c| {
            let tx = c.unchecked_transaction()?;
            let changed = tx.execute(
                "UPDATE files SET content = ?1, size = ?2, processed_data = ?3 WHERE id = ?4",
                params![draft.content, size_param(draft.size)?, draft.processed_data, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let ticket = stage(&tx, id, ReindexOp::Upsert)?;
            tx.commit()?;

            Ok(Some(Staged {
                value: FileRecord {
                    id,
                    content: draft.content,
                    size: draft.size,
                    processed_data: draft.processed_data,
                },
                ticket,
            }))
        }))
    }

    fn delete(&self, id: i64) -> BoxFuture<'_, Result<Option<i64>, FileStoreError>> {
        Box::pin(self.with_conn(move |c| {
            let tx = c.unchecked_transaction()?;
            if tx.execute("DELETE FROM files WHERE id = ?1", params![id])? == 0 {
                return Ok(None);
            }
            let ticket = stage(&tx, id, ReindexOp::Delete)?;
            tx.commit()?;
            Ok(Some(ticket))
        }))
    }

    fn pending_reindex(
        &self,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<ReindexTask>, FileStoreError>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Box::pin(self.with_conn(move |c| {
            let mut stmt = c.prepare(
                "SELECT ticket, file_id, op, attempts, last_error, queued_at
                 FROM index_queue ORDER BY queued_at, ticket LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit], row_to_task)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        }))
    }

    fn complete_reindex(&self, ticket: i64) -> BoxFuture<'_, Result<(), FileStoreError>> {
        Box::pin(self.with_conn(move |c| {
            c.execute("DELETE FROM index_queue WHERE ticket = ?1", params![ticket])?;
            Ok(())
        }))
    }

    fn fail_reindex<'a>(
        &'a self,
        ticket: i64,
        error: &'a str,
    ) -> BoxFuture<'a, Result<(), FileStoreError>> {
        let error = error.to_string();
        Box::pin(self.with_conn(move |c| {
            c.execute(
                "UPDATE index_queue
                 SET attempts = attempts + 1, last_error = ?2, queued_at = ?3
                 WHERE ticket = ?1",
                params![ticket, error, Utc::now()],
            )?;
            Ok(())
        }))
    }

    fn stats(&self) -> BoxFuture<'_, Result<StoreStats, FileStoreError>> {
        Box::pin(self.with_conn(|c| {
            let (files, pending): (i64, i64) = c.query_row(
                "SELECT (SELECT COUNT(*) FROM files), (SELECT COUNT(*) FROM index_queue)",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(StoreStats {
                files: files.max(0) as u64,
                pending_reindex: pending.max(0) as u64,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(content: &str) -> FileDraft {
        FileDraft {
            content: content.into(),
            size: content.len() as u64,
            processed_data: content.into(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let a = store.insert(draft("A\tB")).await.unwrap();
        let b = store.insert(draft("C\tD")).await.unwrap();
        assert!(b.value.id > a.value.id);
        assert!(b.ticket > a.ticket);
        assert_eq!(store.get(a.value.id).await.unwrap(), Some(a.value.clone()));
        assert_eq!(store.list().await.unwrap(), vec![a.value, b.value]);
    }

    #[tokio::test]
    async fn get_many_skips_unknown_ids() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let a = store.insert(draft("one")).await.unwrap().value;
        let b = store.insert(draft("two")).await.unwrap().value;

        let mut found = store.get_many(&[b.id, 999, a.id]).await.unwrap();
        found.sort_by_key(|r| r.id);
        assert_eq!(found, vec![a, b]);
        assert!(store.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        assert_eq!(store.update(999, draft("x")).await.unwrap(), None);
        assert_eq!(store.delete(999).await.unwrap(), None);
        assert!(store.pending_reindex(10).await.unwrap().is_empty());

        let rec = store.insert(draft("old")).await.unwrap().value;
        let updated = store.update(rec.id, draft("new")).await.unwrap().unwrap();
        assert_eq!(updated.value.content, "new");
        assert_eq!(store.get(rec.id).await.unwrap().unwrap().content, "new");

        assert!(store.delete(rec.id).await.unwrap().is_some());
        assert_eq!(store.get(rec.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn mutations_queue_their_vector_task() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let staged = store.insert(draft("a\tb")).await.unwrap();

        let tasks = store.pending_reindex(10).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].ticket, staged.ticket);
        assert_eq!(tasks[0].file_id, staged.value.id);
        assert_eq!(tasks[0].op, ReindexOp::Upsert);
        assert_eq!(tasks[0].attempts, 0);

        store.complete_reindex(staged.ticket).await.unwrap();
        assert!(store.pending_reindex(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_ticket_leaves_newer_task_alone() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let staged = store.insert(draft("x")).await.unwrap();
        store.fail_reindex(staged.ticket, "index down").await.unwrap();
        let delete_ticket = store.delete(staged.value.id).await.unwrap().unwrap();
        assert_ne!(delete_ticket, staged.ticket);

        store.fail_reindex(staged.ticket, "late").await.unwrap();
        store.complete_reindex(staged.ticket).await.unwrap();

        let tasks = store.pending_reindex(10).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].ticket, delete_ticket);
        assert_eq!(tasks[0].op, ReindexOp::Delete);
        assert_eq!(tasks[0].attempts, 0);
        assert_eq!(tasks[0].last_error, None);

        store.complete_reindex(delete_ticket).await.unwrap();
        assert!(store.pending_reindex(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_tasks_move_behind_newer_ones() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let a = store.insert(draft("a")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let b = store.insert(draft("b")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.fail_reindex(a.ticket, "again").await.unwrap();

        let tasks = store.pending_reindex(10).await.unwrap();
        let order: Vec<i64> = tasks.iter().map(|t| t.file_id).collect();
        assert_eq!(order, vec![b.value.id, a.value.id]);
        assert_eq!(tasks[1].attempts, 1);
        assert_eq!(tasks[1].last_error.as_deref(), Some("again"));
    }

    #[tokio::test]
    async fn stats_count_rows() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let staged = store.insert(draft("a")).await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.pending_reindex, 1);

        store.complete_reindex(staged.ticket).await.unwrap();
        assert_eq!(store.stats().await.unwrap().pending_reindex, 0);
    }
}
