//! Response DTOs.

use serde::Serialize;

use crate::storage::FileMetadata;

/// Names returned by `/folders` and `/files`.
///
/// `/files` also uses the `folders` key; existing clients read it there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoldersResponse {
    /// Entry names in listing order.
    pub folders: Vec<String>,
}

/// Result of `/upload`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    /// Metadata of the stored file.
    pub result: FileMetadata,
}
