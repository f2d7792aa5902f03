//! Validated JSON extractor and custom validators.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::lesson::{validate_folder_path, validate_segment};
use crate::web::error::ApiError;

/// A JSON extractor that validates the request body.
///
/// Both a malformed body and a failed validation are rejected with a
/// JSON error (status 500, like every other failure of this API).
///
/// ```ignore
/// async fn list_folders(
///     ValidatedJson(req): ValidatedJson<FolderRequest>,
/// ) -> Result<Json<FoldersResponse>, ApiError> {
///     // req.path is a valid folder path
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::logged("Invalid JSON body", e.body_text()))?;

        value
            .validate()
            .map_err(|e| ApiError::logged("Invalid request", describe(&e)))?;

        Ok(ValidatedJson(value))
    }
}

fn describe(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Custom Validators
// ============================================================================

/// Validate a listing path ("" or an absolute path without `.`/`..`).
pub fn folder_path(value: &str) -> Result<(), ValidationError> {
    validate_folder_path(value).map_err(|e| {
        let mut err = ValidationError::new("folder_path");
        err.message = Some(e.to_string().into());
        err
    })
}

/// Validate a single path segment such as a lesson name.
pub fn path_segment(value: &str) -> Result<(), ValidationError> {
    validate_segment("value", value).map_err(|e| {
        let mut err = ValidationError::new("path_segment");
        err.message = Some(e.to_string().into());
        err
    })
}
