//! Concurrent Index Append Tests
//!
//! Two appends to the same lesson read the index before either writes.
//! Both entries must end up in the index.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Barrier;

use lessondrop::lesson::{LessonService, Manifest, PathLayout, ProjectSubmission};
use lessondrop::storage::{
    Download, FileMetadata, FolderEntry, MemoryStorage, RemoteStorage, SharedLink, StorageError,
    StorageResult, Visibility, WriteMode,
};

const INDEX_PATH: &str = "/GoAI-Test/L1/index.json";

/// Memory storage whose first two index reads wait for each other.
struct LockstepStorage {
    inner: MemoryStorage,
    barrier: Barrier,
    index_reads: AtomicUsize,
    conflicts: AtomicUsize,
}

impl LockstepStorage {
    fn new() -> Self {
        Self {
            inner: MemoryStorage::new(),
            barrier: Barrier::new(2),
            index_reads: AtomicUsize::new(0),
            conflicts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteStorage for LockstepStorage {
    async fn upload(
        &self,
        path: &str,
        contents: Bytes,
        mode: WriteMode,
        autorename: bool,
    ) -> StorageResult<FileMetadata> {
        let result = self.inner.upload(path, contents, mode, autorename).await;
        if result == Err(StorageError::Conflict) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    async fn download(&self, path: &str) -> StorageResult<Download> {
        let result = self.inner.download(path).await;
        if path.eq_ignore_ascii_case(INDEX_PATH)
            && self.index_reads.fetch_add(1, Ordering::SeqCst) < 2
        {
            self.barrier.wait().await;
        }
        result
    }

    async fn list_folder(&self, path: &str, recursive: bool) -> StorageResult<Vec<FolderEntry>> {
        self.inner.list_folder(path, recursive).await
    }

    async fn create_shared_link(
        &self,
        path: &str,
        visibility: Visibility,
    ) -> StorageResult<SharedLink> {
        self.inner.create_shared_link(path, visibility).await
    }

    async fn list_shared_links(
        &self,
        path: &str,
        direct_only: bool,
    ) -> StorageResult<Vec<SharedLink>> {
        self.inner.list_shared_links(path, direct_only).await
    }

    async fn delete(&self, path: &str) -> StorageResult<FileMetadata> {
        self.inner.delete(path).await
    }
}

fn submission(name: &str) -> ProjectSubmission {
    ProjectSubmission {
        lesson: "L1".to_string(),
        name: name.to_string(),
        title: name.to_uppercase(),
        description: String::new(),
    }
}

async fn stored_names(storage: &LockstepStorage) -> Vec<String> {
    let stored = storage.inner.contents(INDEX_PATH).await.unwrap();
    let manifest = Manifest::from_json(&stored).unwrap();
    let mut names: Vec<String> = manifest.entries().iter().map(|e| e.name.clone()).collect();
    names.sort();
    names
}

async fn append_concurrently(storage: Arc<LockstepStorage>, attempts: u32) -> usize {
    let service = LessonService::new(storage, PathLayout::default(), attempts);

    let first = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .append(&submission("alpha"), Bytes::from_static(b"a"))
                .await
        })
    };
    let second = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .append(&submission("beta"), Bytes::from_static(b"b"))
                .await
        })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    results.iter().filter(|r| r.is_ok()).count()
}

#[tokio::test]
async fn test_concurrent_appends_to_new_index() {
    let storage = Arc::new(LockstepStorage::new());

    let succeeded = append_concurrently(storage.clone(), 3).await;

    assert_eq!(succeeded, 2);
    assert_eq!(storage.conflicts.load(Ordering::SeqCst), 1);
    assert_eq!(stored_names(&storage).await, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn test_concurrent_appends_to_existing_index() {
    let storage = Arc::new(LockstepStorage::new());
    storage
        .inner
        .insert(
            INDEX_PATH,
            r#"[{"timestamp":"2024-01-01T00:00:00.000Z","name":"existing","title":"","description":"","downloadUrl":"https://x"}]"#,
        )
        .await;

    let succeeded = append_concurrently(storage.clone(), 3).await;

    assert_eq!(succeeded, 2);
    assert_eq!(storage.conflicts.load(Ordering::SeqCst), 1);
    assert_eq!(
        stored_names(&storage).await,
        vec!["alpha", "beta", "existing"]
    );
}

#[tokio::test]
async fn test_single_attempt_surfaces_conflict() {
    let storage = Arc::new(LockstepStorage::new());

    let succeeded = append_concurrently(storage.clone(), 1).await;

    // The loser fails instead of overwriting the winner's entry
    assert_eq!(succeeded, 1);
    assert_eq!(stored_names(&storage).await.len(), 1);
    // and its artifact is removed again
    let artifacts = storage
        .inner
        .paths()
        .await
        .into_iter()
        .filter(|p| p.ends_with(".sb3"))
        .count();
    assert_eq!(artifacts, 1);
}
