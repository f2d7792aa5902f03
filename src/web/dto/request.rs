//! Request DTOs.

use axum::extract::Multipart;
use bytes::Bytes;
use serde::Deserialize;
use validator::Validate;

use super::validation::{folder_path, path_segment};
use crate::lesson::ProjectSubmission;
use crate::web::error::ApiError;

/// Multipart field carrying the project file.
pub const PROJECT_FILE_FIELD: &str = "projectFile";

/// Body of `/folders` and `/files`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FolderRequest {
    /// Folder to list; empty is the root.
    #[serde(default)]
    #[validate(custom(function = "folder_path"))]
    pub path: String,
}

/// Body of `/get_json`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LessonRequest {
    /// Lesson folder name.
    #[validate(custom(function = "path_segment"))]
    pub lesson: String,
}

/// Query of the OAuth redirect to `/auth`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthCallbackQuery {
    /// Authorization code.
    pub code: Option<String>,
    /// Value sent with the consent request.
    pub state: Option<String>,
    /// Set by the provider when the user declined.
    pub error: Option<String>,
    /// Provider's explanation for `error`.
    pub error_description: Option<String>,
}

/// Multipart form posted to `/upload` and `/edit_json`.
#[derive(Debug, Default)]
pub struct ProjectForm {
    /// Project file contents.
    pub file: Option<Bytes>,
    /// Lesson folder name.
    pub lesson: Option<String>,
    /// Project base name.
    pub name: Option<String>,
    /// Display title.
    pub title: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

impl ProjectForm {
    /// Read all fields of a multipart body. Unknown fields are skipped.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = ProjectForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::internal(format!("Invalid multipart data: {}", e)))?
        {
            let field_name = field.name().unwrap_or_default().to_string();
            match field_name.as_str() {
                PROJECT_FILE_FIELD => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::internal(format!("Failed to read file: {}", e)))?;
                    form.file = Some(data);
                }
                "lesson" | "name" | "title" | "description" => {
                    let text = field.text().await.map_err(|e| {
                        ApiError::internal(format!("Failed to read field {}: {}", field_name, e))
                    })?;
                    let slot = match field_name.as_str() {
                        "lesson" => &mut form.lesson,
                        "name" => &mut form.name,
                        "title" => &mut form.title,
                        _ => &mut form.description,
                    };
                    *slot = Some(text);
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Lesson and file, as needed by `/upload`.
    pub fn into_upload(self) -> Result<(String, Bytes), ApiError> {
        let file = self.file.ok_or_else(|| missing(PROJECT_FILE_FIELD))?;
        let lesson = self.lesson.ok_or_else(|| missing("lesson"))?;
        Ok((lesson, file))
    }

    /// Submission and file, as needed by `/edit_json`.
    ///
    /// `title` and `description` default to empty text.
    pub fn into_submission(self) -> Result<(ProjectSubmission, Bytes), ApiError> {
        let file = self.file.ok_or_else(|| missing(PROJECT_FILE_FIELD))?;
        let submission = ProjectSubmission {
            lesson: self.lesson.ok_or_else(|| missing("lesson"))?,
            name: self.name.ok_or_else(|| missing("name"))?,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
        };
        Ok((submission, file))
    }
}

fn missing(field: &str) -> ApiError {
    ApiError::internal(format!("Missing field: {}", field))
}
