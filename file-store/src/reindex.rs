//! Re-index queue worker and full reconciliation.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::catalog::{FileCatalog, bounded};
use crate::config::ReindexConfig;
use crate::errors::FileStoreError;
use crate::progress::Progress;
use crate::record::ReindexOp;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub synced: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub upserted: usize,
    pub removed: usize,
    pub failed: usize,
    pub queue: DrainReport,
}

/// Retries up to `batch` queued tasks, oldest first.
///
/// Tasks are settled by ticket, so a task that a concurrent mutation replaced
/// while this round ran stays queued for the next one.
pub async fn drain_queue(
    catalog: &FileCatalog,
    batch: usize,
) -> Result<DrainReport, FileStoreError> {
    let store = catalog.store();
    let t = catalog.call_timeout();
    let tasks = bounded("read reindex queue", t, store.pending_reindex(batch)).await?;

    let mut report = DrainReport::default();
    for task in tasks {
        match catalog.reconcile_id(task.file_id).await {
            Ok(op) => {
                bounded("complete reindex", t, store.complete_reindex(task.ticket)).await?;
                debug!(id = task.file_id, op = op.as_str(), "reindex task done");
                report.synced += 1;
            }
            Err(err) => {
                let msg = err.to_string();
                bounded("fail reindex", t, store.fail_reindex(task.ticket, &msg)).await?;
                warn!(
                    id = task.file_id,
                    attempts = task.attempts + 1,
                    error = %err,
                    "reindex task failed"
                );
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Drains the queue every `cfg.interval` until `shutdown` flips to `true`
/// or its sender is dropped.
pub fn spawn_worker(
    catalog: Arc<FileCatalog>,
    cfg: ReindexConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = cfg.interval.as_secs(), batch = cfg.batch, "reindex worker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match drain_queue(&catalog, cfg.batch).await {
                        Ok(r) if r.synced + r.failed > 0 => {
                            info!(synced = r.synced, failed = r.failed, "reindex queue drained");
                        }
                        Ok(_) => {}
                        Err(err) => warn!(error = %err, "reindex round aborted"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("reindex worker stopped");
    })
}

/// Rebuilds the index from the store: every record is re-embedded and
/// upserted, every vector id without a record is removed, then the queue is
/// drained.
pub async fn reconcile_all(
    catalog: &FileCatalog,
    batch: usize,
    progress: &dyn Progress,
) -> Result<ReconcileReport, FileStoreError> {
    let t = catalog.call_timeout();
    let records = catalog.list().await?;
    let indexed = bounded("list vector ids", t, catalog.index().list_ids()).await?;

    let known: HashSet<String> = records.iter().map(|r| r.id.to_string()).collect();
    let orphans: Vec<String> = indexed.into_iter().filter(|id| !known.contains(id)).collect();
    progress.set_total((records.len() + orphans.len()) as u64);
    info!(records = records.len(), orphans = orphans.len(), "reconciling vector index");

    let mut report = ReconcileReport::default();
    for rec in &records {
        match catalog.reconcile_id(rec.id).await {
            Ok(ReindexOp::Upsert) => report.upserted += 1,
            Ok(ReindexOp::Delete) => report.removed += 1,
            Err(err) => {
                warn!(id = rec.id, error = %err, "reindex failed");
                report.failed += 1;
            }
        }
        progress.step(&format!("file {}", rec.id));
    }

    for id in &orphans {
        let outcome = match id.parse::<i64>() {
            Ok(n) => catalog.reconcile_id(n).await.map(|_| ()),
            Err(_) => bounded("delete vector", t, catalog.index().delete_one(id)).await,
        };
        match outcome {
            Ok(()) => report.removed += 1,
            Err(err) => {
                warn!(id = %id, error = %err, "orphan removal failed");
                report.failed += 1;
            }
        }
        progress.step(&format!("orphan {id}"));
    }

    loop {
        let round = drain_queue(catalog, batch.max(1)).await?;
        report.queue.synced += round.synced;
        report.queue.failed += round.failed;
        if round.synced == 0 {
            break;
        }
    }

    progress.finish("reindex complete");
    info!(
        upserted = report.upserted,
        removed = report.removed,
        failed = report.failed,
        queue_synced = report.queue.synced,
        queue_failed = report.queue.failed,
        "reconcile finished"
    );
    Ok(report)
}
