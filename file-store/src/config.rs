//! Runtime configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::FileStoreError;

#[derive(Clone, Debug)]
pub struct FileStoreConfig {
    /// SQLite file (`DATABASE_PATH`, default `uploads.db`).
    pub database_path: PathBuf,
    /// SQLite `busy_timeout` (`DATABASE_BUSY_TIMEOUT_MS`, default 5000).
    pub busy_timeout: Duration,
    /// Deadline for each store, embedding and index call (`CALL_TIMEOUT_SECS`, default 30).
    pub call_timeout: Duration,
    pub reindex: ReindexConfig,
}

#[derive(Clone, Copy, Debug)]
pub struct ReindexConfig {
    /// Queue drain period (`REINDEX_INTERVAL_SECS`, default 30).
    pub interval: Duration,
    /// Tasks per drain round (`REINDEX_BATCH`, default 32).
    pub batch: usize,
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            batch: 32,
        }
    }
}

impl FileStoreConfig {
    pub fn from_env() -> Result<Self, FileStoreError> {
        let cfg = Self {
            database_path: PathBuf::from(env("DATABASE_PATH", "uploads.db")),
            busy_timeout: Duration::from_millis(parse("DATABASE_BUSY_TIMEOUT_MS", 5000u64)?),
            call_timeout: Duration::from_secs(parse("CALL_TIMEOUT_SECS", 30u64)?),
            reindex: ReindexConfig {
                interval: Duration::from_secs(parse("REINDEX_INTERVAL_SECS", 30u64)?),
                batch: parse("REINDEX_BATCH", 32usize)?,
            },
        };
        if cfg.call_timeout.is_zero() || cfg.reindex.interval.is_zero() || cfg.reindex.batch == 0 {
            return Err(FileStoreError::Config(
                "CALL_TIMEOUT_SECS, REINDEX_INTERVAL_SECS and REINDEX_BATCH must be > 0".into(),
            ));
        }
        Ok(cfg)
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| dflt.to_string())
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> Result<T, FileStoreError> {
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| FileStoreError::Config(format!("{k} must be a number, got {v:?}"))),
        _ => Ok(dflt),
    }
}
