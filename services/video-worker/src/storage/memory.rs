use super::{BlobStat, BlobStore, UploadedBlob, split_key};
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// In-process blob store for tests and local runs.
///
/// Counts every call so tests can assert that an idle drain touched nothing,
/// and can be told to fail uploads for keys with a given prefix or to fail
/// every delete.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<BTreeMap<String, StoredBlob>>>,
    failing_prefixes: Arc<Mutex<HashSet<String>>>,
    fail_deletes: Arc<AtomicBool>,
    operations: Arc<AtomicUsize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as an operation.
    pub async fn insert(&self, key: &str, bytes: Vec<u8>, content_type: &str) {
        self.blobs.lock().await.insert(
            key.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
    }

    /// Make every upload whose key starts with `prefix` fail.
    pub async fn fail_uploads_under(&self, prefix: &str) {
        self.failing_prefixes.lock().await.insert(prefix.to_string());
    }

    /// Make every subsequent `delete` fail, leaving the object in place.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.lock().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        self.blobs.lock().await.keys().cloned().collect()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> PipelineResult<UploadedBlob> {
        self.record();
        split_key(key)?;

        let failing = self
            .failing_prefixes
            .lock()
            .await
            .iter()
            .any(|prefix| key.starts_with(prefix));
        if failing {
            return Err(PipelineError::Upload {
                key: key.to_string(),
                message: "injected upload failure".to_string(),
            });
        }

        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| PipelineError::io(local_path, e))?;
        self.insert(key, bytes, content_type).await;

        Ok(UploadedBlob {
            key: key.to_string(),
            url: format!("memory://{}", key),
        })
    }

    async fn download(&self, key: &str) -> PipelineResult<Vec<u8>> {
        self.record();
        self.blobs
            .lock()
            .await
            .get(key)
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| PipelineError::Download {
                key: key.to_string(),
                message: "no such object".to_string(),
            })
    }

    async fn delete(&self, key: &str) -> PipelineResult<()> {
        self.record();
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PipelineError::Delete {
                key: key.to_string(),
                message: "injected delete failure".to_string(),
            });
        }
        self.blobs.lock().await.remove(key);
        Ok(())
    }

    async fn stat(&self, key: &str) -> PipelineResult<Option<BlobStat>> {
        self.record();
        Ok(self.blobs.lock().await.get(key).map(|blob| BlobStat {
            size: blob.bytes.len() as u64,
            content_type: blob.content_type.clone(),
            last_modified: Some(blob.last_modified),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_stat_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumbnail.jpg");
        tokio::fs::write(&path, b"jpeg").await.unwrap();

        let store = MemoryBlobStore::new();
        let uploaded = store
            .upload(&path, "thumbnails/abc.jpg", "image/jpeg")
            .await
            .unwrap();
        assert_eq!(uploaded.url, "memory://thumbnails/abc.jpg");

        let stat = store.stat("thumbnails/abc.jpg").await.unwrap().unwrap();
        assert_eq!(stat.size, 4);
        assert_eq!(stat.content_type, "image/jpeg");

        store.delete("thumbnails/abc.jpg").await.unwrap();
        assert!(store.stat("thumbnails/abc.jpg").await.unwrap().is_none());
        assert_eq!(store.operation_count(), 4);
    }

    #[tokio::test]
    async fn download_of_missing_key_is_an_error() {
        let store = MemoryBlobStore::new();
        let err = store.download("uploads/nope.mp4").await.unwrap_err();
        assert!(matches!(err, PipelineError::Download { .. }));
    }

    #[tokio::test]
    async fn injected_failures_only_hit_matching_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        tokio::fs::write(&path, b"ts").await.unwrap();

        let store = MemoryBlobStore::new();
        store.fail_uploads_under("videos/").await;

        assert!(store.upload(&path, "videos/x/a.ts", "video/mp2t").await.is_err());
        assert!(store.upload(&path, "frames/x/a.ts", "video/mp2t").await.is_ok());
    }

    #[tokio::test]
    async fn injected_delete_failure_keeps_object() {
        let store = MemoryBlobStore::new();
        store.insert("uploads/u1/a.mp4", b"mp4".to_vec(), "video/mp4").await;
        store.fail_deletes(true);

        let err = store.delete("uploads/u1/a.mp4").await.unwrap_err();
        assert!(matches!(err, PipelineError::Delete { .. }));
        assert!(store.contains("uploads/u1/a.mp4").await);
    }
}
