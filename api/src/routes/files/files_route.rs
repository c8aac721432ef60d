//! `/files` CRUD. Every write goes through the catalog so the vector index
//! follows the record store.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use file_store::{FileRecord, FileUpload};

use crate::{core::app_state::AppState, error_handler::AppResult};

/// GET /files
pub async fn list_files(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<FileRecord>>> {
    Ok(Json(state.catalog.list().await?))
}

/// POST /files — stores and indexes a sheet; 201 with the new record.
pub async fn create_file(
    State(state): State<Arc<AppState>>,
    body: Result<Json<FileUpload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<FileRecord>)> {
    let Json(upload) = body?;
    let record = state.catalog.create(upload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /files/{id}
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<FileRecord>> {
    let Path(id) = id?;
    Ok(Json(state.catalog.get(id).await?))
}

/// PUT /files/{id} — 404 without touching the index when the id is unknown.
pub async fn update_file(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<FileUpload>, JsonRejection>,
) -> AppResult<Json<FileRecord>> {
    let Path(id) = id?;
    let Json(upload) = body?;
    Ok(Json(state.catalog.update(id, upload).await?))
}

/// DELETE /files/{id} — 204.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    state.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
