use std::sync::Arc;

use ai_llm_service::config::default_config::{config_chat_from_env, config_embedding_from_env};
use ai_llm_service::service_profiles::LlmServiceProfiles;
use contextor::{ChatPipeline, ContextAssembler, ContextorConfig};
use file_store::{FileCatalog, FileStoreConfig, ReindexConfig, SqliteRecordStore};
use rag_store::{LlmEmbedder, QdrantFacade, RagConfig};
use tracing::info;

use crate::error_handler::AppError;

const DEFAULT_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Listener settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// `API_ADDRESS`, default `127.0.0.1:8080`.
    pub address: String,
    /// Request body cap (`MAX_UPLOAD_BYTES`, default 10 MiB).
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let address = std::env::var("API_ADDRESS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ADDRESS.into());
        let max_upload_bytes = match std::env::var("MAX_UPLOAD_BYTES") {
            Ok(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| {
                AppError::Config(format!("MAX_UPLOAD_BYTES must be a number, got {v:?}"))
            })?,
            _ => DEFAULT_MAX_UPLOAD_BYTES,
        };
        Ok(Self {
            address,
            max_upload_bytes,
        })
    }
}

/// Shared state for all HTTP handlers. Built once at startup.
pub struct AppState {
    /// Write path for files; keeps store and vector index in step.
    pub catalog: Arc<FileCatalog>,
    pub chat: ChatPipeline,
    /// Provider profiles, probed by `/health`.
    pub llm: Arc<LlmServiceProfiles>,
    pub reindex: ReindexConfig,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Builds every client from environment variables and makes sure the
    /// vector collection exists. Listener settings are read once by the
    /// caller and passed in.
    pub async fn from_env(server: &ServerConfig) -> Result<Self, AppError> {
        let files_cfg = FileStoreConfig::from_env()?;
        let rag_cfg = RagConfig::from_env()?;

        let llm = Arc::new(LlmServiceProfiles::new(
            config_chat_from_env()?,
            config_embedding_from_env()?,
            None,
        )?);
        let embedder = Arc::new(LlmEmbedder::new(llm.clone(), rag_cfg.dim));

        let index = Arc::new(QdrantFacade::new(&rag_cfg)?);
        index.ensure_collection().await?;

        let store = Arc::new(SqliteRecordStore::open(
            &files_cfg.database_path,
            files_cfg.busy_timeout,
        )?);

        let catalog = Arc::new(FileCatalog::new(
            store.clone(),
            index.clone(),
            embedder.clone(),
            files_cfg.call_timeout,
        ));
        let chat_cfg = ContextorConfig {
            call_timeout: files_cfg.call_timeout,
            ..ContextorConfig::from_env()
        };
        let assembler = ContextAssembler::new(embedder, index, store, chat_cfg);
        let chat = ChatPipeline::new(assembler, llm.clone());

        info!(
            collection = %rag_cfg.collection,
            database = %files_cfg.database_path.display(),
            "application state ready"
        );

        Ok(Self {
            catalog,
            chat,
            llm,
            reindex: files_cfg.reindex,
            max_upload_bytes: server.max_upload_bytes,
        })
    }
}
