//! In-process storage backend.
//!
//! Mirrors the Dropbox behaviors the application relies on: case-insensitive
//! paths, `name (1).ext` autorename, revision tags checked by conditional
//! writes, and at most one shared link per path.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use super::{
    Download, EntryKind, FileMetadata, FolderEntry, RemoteStorage, SharedLink, StorageError,
    StorageResult, Visibility, WriteMode,
};

/// Base URL of links handed out by the memory backend.
const LINK_BASE: &str = "https://memory.lessondrop.local/s";

#[derive(Debug, Clone)]
struct StoredFile {
    display: String,
    contents: Bytes,
    rev: String,
    id: String,
}

#[derive(Debug, Default)]
struct Inner {
    /// Keyed by lower-cased path.
    files: BTreeMap<String, StoredFile>,
    /// Lower-cased path to link URL.
    links: HashMap<String, String>,
    next_rev: u64,
}

impl Inner {
    fn next_rev(&mut self) -> String {
        self.next_rev += 1;
        format!("{:09x}", self.next_rev)
    }

    fn metadata(&self, key: &str) -> Option<FileMetadata> {
        self.files.get(key).map(|f| FileMetadata {
            name: last_component(&f.display).to_string(),
            path_lower: Some(key.to_string()),
            path_display: Some(f.display.clone()),
            id: f.id.clone(),
            rev: f.rev.clone(),
            size: f.contents.len() as u64,
            server_modified: None,
        })
    }

    fn is_folder(&self, key: &str) -> bool {
        key.is_empty() || {
            let prefix = format!("{key}/");
            self.files.keys().any(|k| k.starts_with(&prefix))
        }
    }

    /// First free `stem (n).ext` sibling of `display`.
    fn autorename(&self, display: &str) -> String {
        let (dir, name) = split_parent(display);
        let (stem, ext) = match name.rfind('.') {
            Some(i) if i > 0 => (&name[..i], &name[i..]),
            _ => (name, ""),
        };
        let mut n = 1;
        loop {
            let candidate = format!("{dir}/{stem} ({n}){ext}");
            if !self.files.contains_key(&candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// In-memory [`RemoteStorage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file directly, overwriting any existing one.
    pub async fn insert(&self, path: &str, contents: impl Into<Bytes>) -> FileMetadata {
        let display = normalize(path);
        let key = display.to_lowercase();
        let mut inner = self.inner.lock().await;
        let rev = inner.next_rev();
        let contents: Bytes = contents.into();
        let metadata = FileMetadata {
            name: last_component(&display).to_string(),
            path_lower: Some(key.clone()),
            path_display: Some(display.clone()),
            id: format!("id:{rev}"),
            rev: rev.clone(),
            size: contents.len() as u64,
            server_modified: None,
        };
        inner.files.insert(
            key,
            StoredFile {
                display,
                contents,
                rev,
                id: metadata.id.clone(),
            },
        );
        metadata
    }

    /// Contents of the file at `path`, if any.
    pub async fn contents(&self, path: &str) -> Option<Bytes> {
        let key = normalize(path).to_lowercase();
        self.inner
            .lock()
            .await
            .files
            .get(&key)
            .map(|f| f.contents.clone())
    }

    /// Display paths of all stored files, sorted.
    pub async fn paths(&self) -> Vec<String> {
        self.inner
            .lock()
            .await
            .files
            .values()
            .map(|f| f.display.clone())
            .collect()
    }
}

/// Ensure a leading slash and drop a trailing one; "" and "/" are the root.
fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

fn last_component(path: &str) -> &str {
    split_parent(path).1
}

#[async_trait]
impl RemoteStorage for MemoryStorage {
    async fn upload(
        &self,
        path: &str,
        contents: Bytes,
        mode: WriteMode,
        autorename: bool,
    ) -> StorageResult<FileMetadata> {
        let mut display = normalize(path);
        if display.is_empty() {
            return Err(StorageError::Api {
                status: 400,
                summary: "path/malformed_path/".to_string(),
            });
        }
        let mut inner = self.inner.lock().await;
        let key = display.to_lowercase();
        let existing = inner.files.get(&key).cloned();

        match (&mode, existing) {
            (WriteMode::Add, Some(current)) => {
                if current.contents == contents {
                    return inner.metadata(&key).ok_or(StorageError::PathNotFound);
                }
                if !autorename {
                    return Err(StorageError::Conflict);
                }
                display = inner.autorename(&display);
            }
            (WriteMode::Update(rev), Some(current)) if &current.rev != rev => {
                if !autorename {
                    return Err(StorageError::Conflict);
                }
                display = inner.autorename(&display);
            }
            (WriteMode::Update(_), None) => return Err(StorageError::Conflict),
            _ => {}
        }

        let key = display.to_lowercase();
        let rev = inner.next_rev();
        let id = inner
            .files
            .get(&key)
            .map(|f| f.id.clone())
            .unwrap_or_else(|| format!("id:{rev}"));
        inner.files.insert(
            key.clone(),
            StoredFile {
                display,
                contents,
                rev,
                id,
            },
        );
        inner.metadata(&key).ok_or(StorageError::PathNotFound)
    }

    async fn download(&self, path: &str) -> StorageResult<Download> {
        let key = normalize(path).to_lowercase();
        let inner = self.inner.lock().await;
        let file = inner.files.get(&key).ok_or(StorageError::PathNotFound)?;
        let contents = file.contents.clone();
        let metadata = inner.metadata(&key).ok_or(StorageError::PathNotFound)?;
        Ok(Download { metadata, contents })
    }

    async fn list_folder(&self, path: &str, recursive: bool) -> StorageResult<Vec<FolderEntry>> {
        let key = normalize(path).to_lowercase();
        let inner = self.inner.lock().await;
        if !inner.is_folder(&key) {
            return Err(StorageError::PathNotFound);
        }

        let prefix = format!("{key}/");
        let base_depth = key.split('/').count() - 1;
        // lower-cased path -> first display path seen
        let mut folders = BTreeMap::new();
        let mut files = Vec::new();
        for (file_key, file) in inner.files.range(prefix.clone()..) {
            if !file_key.starts_with(&prefix) {
                break;
            }
            let components: Vec<&str> = file.display.split('/').skip(1).collect();
            let (base, rest) = components.split_at(base_depth);
            let folder_depth = if recursive { rest.len() - 1 } else { rest.len().min(2) - 1 };
            for i in 1..=folder_depth {
                let folder: Vec<&str> = base.iter().chain(&rest[..i]).copied().collect();
                let display = format!("/{}", folder.join("/"));
                folders.entry(display.to_lowercase()).or_insert(display);
            }
            if recursive || rest.len() == 1 {
                files.push(FolderEntry {
                    tag: EntryKind::File,
                    name: rest[rest.len() - 1].to_string(),
                    path_lower: Some(file_key.clone()),
                });
            }
        }

        let mut entries: Vec<FolderEntry> = folders
            .into_iter()
            .map(|(lower, display)| FolderEntry {
                tag: EntryKind::Folder,
                name: last_component(&display).to_string(),
                path_lower: Some(lower),
            })
            .collect();
        entries.extend(files);
        Ok(entries)
    }

    async fn create_shared_link(
        &self,
        path: &str,
        _visibility: Visibility,
    ) -> StorageResult<SharedLink> {
        let key = normalize(path).to_lowercase();
        let mut inner = self.inner.lock().await;
        let file = inner.files.get(&key).ok_or(StorageError::PathNotFound)?;
        if inner.links.contains_key(&key) {
            return Err(StorageError::LinkAlreadyExists);
        }
        let url = format!(
            "{LINK_BASE}/{}/{}?dl=0",
            file.id.trim_start_matches("id:"),
            last_component(&file.display)
        );
        inner.links.insert(key.clone(), url.clone());
        Ok(SharedLink {
            url,
            path_lower: Some(key),
        })
    }

    async fn list_shared_links(
        &self,
        path: &str,
        _direct_only: bool,
    ) -> StorageResult<Vec<SharedLink>> {
        let key = normalize(path).to_lowercase();
        let inner = self.inner.lock().await;
        Ok(inner
            .links
            .get(&key)
            .map(|url| SharedLink {
                url: url.clone(),
                path_lower: Some(key.clone()),
            })
            .into_iter()
            .collect())
    }

    async fn delete(&self, path: &str) -> StorageResult<FileMetadata> {
        let key = normalize(path).to_lowercase();
        let mut inner = self.inner.lock().await;
        let metadata = inner.metadata(&key).ok_or(StorageError::PathNotFound)?;
        inner.files.remove(&key);
        inner.links.remove(&key);
        Ok(metadata)
    }
}
