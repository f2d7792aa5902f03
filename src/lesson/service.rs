//! Lesson operations on top of remote storage.
//!
//! The interesting one is [`LessonService::append`]: upload an artifact,
//! obtain its shared link and append an entry to the lesson's `index.json`.
//!
//! The index update is a read-modify-write on shared remote state. Each
//! write is conditional on the revision that was read (or requires the file
//! to still be absent), and a conflicting write is retried from a fresh
//! read, so concurrent appends do not drop each other's entries.
//!
//! If a step after the artifact upload fails, the artifact is deleted again
//! so it is not left behind without an index entry. An artifact that already
//! had a shared link is never deleted.

use std::sync::Arc;

use bytes::Bytes;

use super::listing::names_of_kind;
use super::manifest::{Manifest, ManifestEntry};
use super::paths::{validate_folder_path, PathLayout};
use crate::error::Result;
use crate::storage::{
    EntryKind, FileMetadata, RemoteStorage, StorageError, Visibility, WriteMode,
};

/// Metadata submitted with a project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSubmission {
    /// Lesson folder.
    pub lesson: String,
    /// Project base name (without extension).
    pub name: String,
    /// Display title.
    pub title: String,
    /// Free-text description.
    pub description: String,
}

struct ArtifactLink {
    url: String,
    reused: bool,
}

/// Lesson uploads, listings and indexes.
#[derive(Clone)]
pub struct LessonService {
    storage: Arc<dyn RemoteStorage>,
    layout: PathLayout,
    write_attempts: u32,
}

impl LessonService {
    /// Create a service. `write_attempts` is clamped to at least one.
    pub fn new(storage: Arc<dyn RemoteStorage>, layout: PathLayout, write_attempts: u32) -> Self {
        Self {
            storage,
            layout,
            write_attempts: write_attempts.max(1),
        }
    }

    /// Path layout in use.
    pub fn layout(&self) -> &PathLayout {
        &self.layout
    }

    /// Upload a project to the lesson's upload location, never overwriting.
    pub async fn upload_project(&self, lesson: &str, contents: Bytes) -> Result<FileMetadata> {
        let path = self.layout.upload_path(lesson)?;
        let metadata = self
            .storage
            .upload(&path, contents, WriteMode::Add, true)
            .await?;
        tracing::info!(lesson = %lesson, path = %metadata.stored_path(), "Project uploaded");
        Ok(metadata)
    }

    /// Names of the immediate children of `path` that are of `kind`.
    pub async fn list_names(&self, path: &str, kind: EntryKind) -> Result<Vec<String>> {
        validate_folder_path(path)?;
        let entries = self.storage.list_folder(path, false).await?;
        Ok(names_of_kind(&entries, kind))
    }

    /// Read a lesson's index. A missing index is an error here.
    pub async fn read_manifest(&self, lesson: &str) -> Result<Manifest> {
        let path = self.layout.index_path(lesson)?;
        let download = self.storage.download(&path).await?;
        Manifest::from_json(&download.contents)
    }

    /// Upload an artifact and record it in the lesson's index.
    ///
    /// Returns the index as written.
    pub async fn append(&self, submission: &ProjectSubmission, contents: Bytes) -> Result<Manifest> {
        let artifact_path = self
            .layout
            .artifact_path(&submission.lesson, &submission.name)?;
        let index_path = self.layout.index_path(&submission.lesson)?;

        let uploaded = self
            .storage
            .upload(&artifact_path, contents, WriteMode::Add, true)
            .await?;
        let stored_path = uploaded.stored_path().to_string();
        tracing::debug!(path = %stored_path, "Artifact uploaded");

        let link = match self
            .storage
            .create_shared_link(&stored_path, Visibility::Public)
            .await
        {
            Ok(link) => ArtifactLink {
                url: link.url,
                reused: false,
            },
            // The file was already published before this call, so it is
            // never discarded from here on.
            Err(StorageError::LinkAlreadyExists) => ArtifactLink {
                url: self.existing_link(&stored_path).await?,
                reused: true,
            },
            Err(e) => {
                self.discard_artifact(&stored_path).await;
                return Err(e.into());
            }
        };

        let entry = ManifestEntry::new(
            submission.name.clone(),
            submission.title.clone(),
            submission.description.clone(),
            link.url,
        );
        match self.append_entry(&index_path, entry).await {
            Ok(manifest) => {
                tracing::info!(
                    lesson = %submission.lesson,
                    entries = manifest.len(),
                    "Lesson index updated"
                );
                Ok(manifest)
            }
            Err(e) => {
                if !link.reused {
                    self.discard_artifact(&stored_path).await;
                }
                Err(e)
            }
        }
    }

    /// The link already published for `path`.
    async fn existing_link(&self, path: &str) -> Result<String> {
        tracing::debug!(path = %path, "Shared link exists, reusing it");
        let links = self.storage.list_shared_links(path, true).await?;
        let link = links.into_iter().next().ok_or_else(|| StorageError::Api {
            status: 409,
            summary: format!("shared link exists for {path} but none was listed"),
        })?;
        Ok(link.url)
    }

    async fn append_entry(&self, index_path: &str, entry: ManifestEntry) -> Result<Manifest> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (mut manifest, mode) = match self.storage.download(index_path).await {
                Ok(download) => {
                    let mode = if download.metadata.rev.is_empty() {
                        WriteMode::Overwrite
                    } else {
                        WriteMode::Update(download.metadata.rev)
                    };
                    (Manifest::from_json(&download.contents)?, mode)
                }
                Err(StorageError::PathNotFound) => (Manifest::new(), WriteMode::Add),
                Err(e) => return Err(e.into()),
            };

            manifest.push(entry.clone());
            let encoded = Bytes::from(manifest.to_json()?);

            match self.storage.upload(index_path, encoded, mode, false).await {
                Ok(_) => return Ok(manifest),
                Err(StorageError::Conflict) if attempt < self.write_attempts => {
                    tracing::warn!(
                        path = %index_path,
                        attempt,
                        "Index changed while appending, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn discard_artifact(&self, path: &str) {
        match self.storage.delete(path).await {
            Ok(_) => tracing::info!(path = %path, "Removed artifact after failed index update"),
            Err(e) => tracing::warn!(
                path = %path,
                error = %e,
                "Failed to remove artifact after failed index update"
            ),
        }
    }
}

impl std::fmt::Debug for LessonService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LessonService")
            .field("layout", &self.layout)
            .field("write_attempts", &self.write_attempts)
            .finish_non_exhaustive()
    }
}
