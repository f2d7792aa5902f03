//! Folder listing handlers.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::storage::EntryKind;
use crate::web::dto::{FolderRequest, FoldersResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// POST /folders - names of the immediate subfolders of `path`.
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<FolderRequest>,
) -> Result<Json<FoldersResponse>, ApiError> {
    let folders = state
        .lessons
        .list_names(&req.path, EntryKind::Folder)
        .await
        .map_err(|e| ApiError::logged("Failed to read folders", e))?;

    Ok(Json(FoldersResponse { folders }))
}

/// POST /files - names of the files directly inside `path`.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<FolderRequest>,
) -> Result<Json<FoldersResponse>, ApiError> {
    let folders = state
        .lessons
        .list_names(&req.path, EntryKind::File)
        .await
        .map_err(|e| ApiError::logged("Failed to read files", e))?;

    Ok(Json(FoldersResponse { folders }))
}
