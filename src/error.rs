//! Error types for LessonDrop.

use thiserror::Error;

use crate::storage::StorageError;

/// Common error type for LessonDrop.
#[derive(Error, Debug)]
pub enum LessonDropError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error (manifests, token files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Remote storage error.
    ///
    /// Carries the structured kind reported by the storage client so callers
    /// can recover from specific conditions.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// OAuth authorization error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LessonDropError {
    /// Returns the storage error kind, if this is a storage error.
    pub fn storage_kind(&self) -> Option<&StorageError> {
        match self {
            LessonDropError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for LessonDrop operations.
pub type Result<T> = std::result::Result<T, LessonDropError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let err = LessonDropError::Auth("unknown state".to_string());
        assert_eq!(err.to_string(), "authentication error: unknown state");
    }

    #[test]
    fn test_validation_error_display() {
        let err = LessonDropError::Validation("lesson is empty".to_string());
        assert_eq!(err.to_string(), "validation error: lesson is empty");
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: LessonDropError = StorageError::PathNotFound.into();
        assert!(matches!(
            err.storage_kind(),
            Some(StorageError::PathNotFound)
        ));
        assert!(err.to_string().starts_with("storage error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LessonDropError = io_err.into();
        assert!(matches!(err, LessonDropError::Io(_)));
        assert!(err.to_string().contains("file not found"));
        assert!(err.storage_kind().is_none());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err: LessonDropError = json_err.into();
        assert!(matches!(err, LessonDropError::Json(_)));
    }
}
