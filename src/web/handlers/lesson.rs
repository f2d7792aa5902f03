//! Lesson project and index handlers.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};

use crate::lesson::Manifest;
use crate::web::dto::{LessonRequest, ProjectForm, UploadResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// POST /upload - store a project as the lesson's example file.
pub async fn upload_project(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::logged_plain("Upload failed", e))?;
    let (lesson, file) = ProjectForm::from_multipart(multipart)
        .await
        .and_then(ProjectForm::into_upload)
        .map_err(|e| ApiError::logged_plain("Upload failed", e))?;

    let result = state
        .lessons
        .upload_project(&lesson, file)
        .await
        .map_err(|e| ApiError::logged_plain("Upload failed", e))?;

    Ok(Json(UploadResponse { result }))
}

/// POST /get_json - the lesson's index.
pub async fn get_index(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LessonRequest>,
) -> Result<Json<Manifest>, ApiError> {
    let manifest = state
        .lessons
        .read_manifest(&req.lesson)
        .await
        .map_err(|e| ApiError::logged("Failed to read index", e))?;

    Ok(Json(manifest))
}

/// POST /edit_json - upload a project and append it to the lesson's index.
pub async fn append_to_index(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Manifest>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::logged("Failed to update index", e))?;
    let (submission, file) = ProjectForm::from_multipart(multipart)
        .await
        .and_then(ProjectForm::into_submission)
        .map_err(|e| ApiError::logged("Failed to update index", e))?;

    let manifest = state
        .lessons
        .append(&submission, file)
        .await
        .map_err(|e| ApiError::logged("Failed to update index", e))?;

    Ok(Json(manifest))
}
