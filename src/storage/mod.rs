//! Remote storage client.
//!
//! The rest of the crate talks to file storage only through the
//! [`RemoteStorage`] trait. Two implementations exist:
//!
//! - [`DropboxClient`]: the Dropbox HTTP API v2
//! - [`MemoryStorage`]: an in-process store with the same semantics,
//!   used for local development and tests
//!
//! Errors carry a structured [`StorageError`] kind. Callers recover from
//! `LinkAlreadyExists`, `PathNotFound` and `Conflict` by matching variants.

mod dropbox;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dropbox::DropboxClient;
pub use memory::MemoryStorage;

/// Structured storage error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A shared link already exists for the path.
    #[error("shared link already exists")]
    LinkAlreadyExists,

    /// The path does not exist.
    #[error("path not found")]
    PathNotFound,

    /// The write conflicts with the current state of the path
    /// (existing file with `Add` and no autorename, or a stale revision).
    #[error("write conflict")]
    Conflict,

    /// No account has been connected through the OAuth flow yet.
    #[error("storage account is not connected")]
    NotConnected,

    /// The provider rejected the credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other provider error.
    #[error("provider error ({status}): {summary}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error summary.
        summary: String,
    },

    /// Network or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Write semantics for uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// Never overwrite an existing file.
    Add,
    /// Replace whatever is at the path.
    Overwrite,
    /// Replace the file only if its current revision matches.
    Update(String),
}

/// Visibility requested for a new shared link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Anyone with the link.
    Public,
    /// Team members only.
    TeamOnly,
    /// Password protected.
    Password,
}

/// Metadata of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Last path component.
    pub name: String,
    /// Lower-cased full path.
    #[serde(default)]
    pub path_lower: Option<String>,
    /// Full path with the original casing.
    #[serde(default)]
    pub path_display: Option<String>,
    /// Provider file id.
    #[serde(default)]
    pub id: String,
    /// Revision tag, used for conditional writes.
    #[serde(default)]
    pub rev: String,
    /// File size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Server modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_modified: Option<String>,
}

impl FileMetadata {
    /// Path to use for follow-up calls on this file.
    pub fn stored_path(&self) -> &str {
        self.path_lower
            .as_deref()
            .or(self.path_display.as_deref())
            .unwrap_or(&self.name)
    }
}

/// A downloaded file.
#[derive(Debug, Clone)]
pub struct Download {
    /// File metadata (carries the revision).
    pub metadata: FileMetadata,
    /// File contents.
    pub contents: Bytes,
}

/// Kind of a folder listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A folder.
    Folder,
    /// A file.
    File,
    /// A deleted entry (only reported by some listings).
    #[serde(other)]
    Deleted,
}

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Entry kind.
    #[serde(rename = ".tag")]
    pub tag: EntryKind,
    /// Last path component.
    pub name: String,
    /// Lower-cased full path.
    #[serde(default)]
    pub path_lower: Option<String>,
}

/// A public shared link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedLink {
    /// Link URL.
    pub url: String,
    /// Lower-cased path of the linked file.
    #[serde(default)]
    pub path_lower: Option<String>,
}

/// Capability set of a remote file store.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Upload `contents` to `path`.
    ///
    /// Returns the metadata of the stored file; with `autorename` the stored
    /// path may differ from the requested one.
    async fn upload(
        &self,
        path: &str,
        contents: Bytes,
        mode: WriteMode,
        autorename: bool,
    ) -> StorageResult<FileMetadata>;

    /// Download the file at `path`.
    async fn download(&self, path: &str) -> StorageResult<Download>;

    /// List the entries of the folder at `path` ("" is the root).
    async fn list_folder(&self, path: &str, recursive: bool) -> StorageResult<Vec<FolderEntry>>;

    /// Create a shared link for `path`.
    ///
    /// Fails with [`StorageError::LinkAlreadyExists`] if the path already has one.
    async fn create_shared_link(
        &self,
        path: &str,
        visibility: Visibility,
    ) -> StorageResult<SharedLink>;

    /// List existing shared links for `path`.
    async fn list_shared_links(&self, path: &str, direct_only: bool)
        -> StorageResult<Vec<SharedLink>>;

    /// Delete the file or folder at `path`.
    async fn delete(&self, path: &str) -> StorageResult<FileMetadata>;
}
