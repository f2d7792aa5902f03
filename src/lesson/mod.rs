//! Lesson domain: path layout, listing filter, manifests and the
//! upload/index workflow.

pub mod listing;
pub mod manifest;
pub mod paths;
pub mod service;

pub use listing::names_of_kind;
pub use manifest::{now_timestamp, Manifest, ManifestEntry};
pub use paths::{validate_folder_path, validate_segment, PathLayout};
pub use service::{LessonService, ProjectSubmission};
