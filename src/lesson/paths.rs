//! Storage path layout and path-segment policy.
//!
//! `lesson` and `name` come straight from request bodies and end up inside
//! storage paths, so each must be a single plain segment: non-empty, at most
//! [`MAX_SEGMENT_LENGTH`] characters, not `.` or `..`, without `/`, `\` or
//! control characters. Listing paths must be the root (empty) or absolute
//! with no `.`/`..` components.

use crate::config::LessonsConfig;
use crate::error::{LessonDropError, Result};

/// Maximum length of a single path segment in characters.
pub const MAX_SEGMENT_LENGTH: usize = 255;

/// Extension of uploaded project files.
pub const PROJECT_EXTENSION: &str = "sb3";

/// File name of a lesson index.
pub const INDEX_FILE_NAME: &str = "index.json";

/// Validate a single path segment supplied by a client.
pub fn validate_segment(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(LessonDropError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > MAX_SEGMENT_LENGTH {
        return Err(LessonDropError::Validation(format!(
            "{field} must be at most {MAX_SEGMENT_LENGTH} characters"
        )));
    }
    if value == "." || value == ".." {
        return Err(LessonDropError::Validation(format!(
            "{field} must not be a relative path component"
        )));
    }
    if value
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(LessonDropError::Validation(format!(
            "{field} must not contain path separators or control characters"
        )));
    }
    Ok(())
}

/// Validate a folder path used for listings ("" or "/" is the root).
pub fn validate_folder_path(path: &str) -> Result<()> {
    if path.is_empty() || path == "/" {
        return Ok(());
    }
    if !path.starts_with('/') {
        return Err(LessonDropError::Validation(
            "path must be empty or start with '/'".to_string(),
        ));
    }
    let trimmed = path.trim_end_matches('/');
    for segment in trimmed[1..].split('/') {
        validate_segment("path segment", segment)?;
    }
    Ok(())
}

/// Normalize a configured root: "" or "/Folder" without a trailing slash.
fn normalize_root(root: &str) -> String {
    let trimmed = root.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Where lesson files live in remote storage.
///
/// `/upload` and the index routes use different roots; both come from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLayout {
    upload_root: String,
    index_root: String,
    upload_file_name: String,
}

impl PathLayout {
    /// Layout with explicit roots.
    pub fn new(upload_root: &str, index_root: &str, upload_file_name: &str) -> Self {
        Self {
            upload_root: normalize_root(upload_root),
            index_root: normalize_root(index_root),
            upload_file_name: upload_file_name.to_string(),
        }
    }

    /// Layout from the `[lessons]` configuration.
    pub fn from_config(config: &LessonsConfig) -> Self {
        Self::new(
            &config.upload_root,
            &config.index_root,
            &config.upload_file_name,
        )
    }

    /// `{upload_root}/{lesson}/{upload_file_name}`.
    pub fn upload_path(&self, lesson: &str) -> Result<String> {
        validate_segment("lesson", lesson)?;
        Ok(format!(
            "{}/{}/{}",
            self.upload_root, lesson, self.upload_file_name
        ))
    }

    /// `{index_root}/{lesson}/{name}.sb3`.
    pub fn artifact_path(&self, lesson: &str, name: &str) -> Result<String> {
        validate_segment("lesson", lesson)?;
        validate_segment("name", name)?;
        Ok(format!(
            "{}/{}/{}.{}",
            self.index_root, lesson, name, PROJECT_EXTENSION
        ))
    }

    /// `{index_root}/{lesson}/index.json`.
    pub fn index_path(&self, lesson: &str) -> Result<String> {
        validate_segment("lesson", lesson)?;
        Ok(format!("{}/{}/{}", self.index_root, lesson, INDEX_FILE_NAME))
    }
}

impl Default for PathLayout {
    fn default() -> Self {
        Self::from_config(&LessonsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_paths() {
        let layout = PathLayout::default();
        assert_eq!(layout.upload_path("L1").unwrap(), "/L1/example.sb3");
        assert_eq!(
            layout.artifact_path("L1", "robot").unwrap(),
            "/GoAI-Test/L1/robot.sb3"
        );
        assert_eq!(
            layout.index_path("L1").unwrap(),
            "/GoAI-Test/L1/index.json"
        );
    }

    #[test]
    fn test_roots_are_normalized() {
        let layout = PathLayout::new("uploads/", "/Lessons/", "p.sb3");
        assert_eq!(layout.upload_path("a").unwrap(), "/uploads/a/p.sb3");
        assert_eq!(layout.index_path("a").unwrap(), "/Lessons/a/index.json");
    }

    #[test]
    fn test_segment_accepts_plain_names() {
        assert!(validate_segment("lesson", "Lesson 3 - Loops").is_ok());
        assert!(validate_segment("name", "my.project").is_ok());
        assert!(validate_segment("name", "Übung").is_ok());
    }

    #[test]
    fn test_segment_rejects_traversal() {
        assert!(validate_segment("lesson", "").is_err());
        assert!(validate_segment("lesson", ".").is_err());
        assert!(validate_segment("lesson", "..").is_err());
        assert!(validate_segment("lesson", "../other").is_err());
        assert!(validate_segment("lesson", "a/b").is_err());
        assert!(validate_segment("lesson", "a\\b").is_err());
        assert!(validate_segment("lesson", "a\nb").is_err());
        assert!(validate_segment("lesson", &"x".repeat(MAX_SEGMENT_LENGTH + 1)).is_err());
        assert!(validate_segment("lesson", &"x".repeat(MAX_SEGMENT_LENGTH)).is_ok());
    }

    #[test]
    fn test_layout_rejects_bad_segments() {
        let layout = PathLayout::default();
        assert!(layout.upload_path("..").is_err());
        assert!(layout.artifact_path("L1", "../index").is_err());
        assert!(matches!(
            layout.index_path(""),
            Err(LessonDropError::Validation(_))
        ));
    }

    #[test]
    fn test_folder_path_policy() {
        assert!(validate_folder_path("").is_ok());
        assert!(validate_folder_path("/").is_ok());
        assert!(validate_folder_path("/root").is_ok());
        assert!(validate_folder_path("/GoAI-Test/L1/").is_ok());
        assert!(validate_folder_path("root").is_err());
        assert!(validate_folder_path("/root/../secret").is_err());
        assert!(validate_folder_path("/root//x").is_err());
    }
}
