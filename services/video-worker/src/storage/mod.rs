//! Blob store gateway
//!
//! Keys are slash-delimited; the first segment names the logical bucket
//! (`uploads/u1/j1/original.mp4` lives in bucket `uploads` under
//! `u1/j1/original.mp4`).

use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

pub mod memory;
pub mod s3;

pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

/// Buckets the worker reads from or writes to.
pub const KNOWN_BUCKETS: [&str; 4] = ["uploads", "videos", "thumbnails", "frames"];

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedBlob {
    pub key: String,
    pub url: String,
}

/// Object metadata returned by `stat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobStat {
    pub size: u64,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload a local file and return a durable retrieval URL.
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> PipelineResult<UploadedBlob>;

    async fn download(&self, key: &str) -> PipelineResult<Vec<u8>>;

    async fn delete(&self, key: &str) -> PipelineResult<()>;

    /// `Ok(None)` when the object does not exist.
    async fn stat(&self, key: &str) -> PipelineResult<Option<BlobStat>>;
}

/// Split a key into `(bucket, object key)`, rejecting unknown buckets.
pub fn split_key(key: &str) -> PipelineResult<(&str, &str)> {
    let (bucket, rest) = key
        .split_once('/')
        .ok_or_else(|| PipelineError::InvalidKey(key.to_string()))?;

    if rest.is_empty() || !KNOWN_BUCKETS.contains(&bucket) {
        return Err(PipelineError::InvalidKey(key.to_string()));
    }

    Ok((bucket, rest))
}

/// Content type for a generated artifact, from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
