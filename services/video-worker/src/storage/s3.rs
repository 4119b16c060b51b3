use super::{BlobStat, BlobStore, KNOWN_BUCKETS, UploadedBlob, split_key};
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use aws_sdk_s3::{Client, presigning::PresigningConfig, primitives::ByteStream};
use chrono::DateTime;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// S3 (or MinIO) backed blob store.
///
/// Returned URLs are presigned GET URLs unless a CDN base URL is configured,
/// in which case `{cdn_base_url}/{key}` is returned.
#[derive(Clone)]
pub struct S3BlobStore {
    s3_client: Client,
    cdn_base_url: Option<String>,
    url_expiry: Duration,
}

impl S3BlobStore {
    pub fn new(s3_client: Client, cdn_base_url: Option<String>, url_expiry: Duration) -> Self {
        Self {
            s3_client,
            cdn_base_url: cdn_base_url.map(|url| url.trim_end_matches('/').to_string()),
            url_expiry,
        }
    }

    /// Create any of the worker's buckets that do not exist yet.
    pub async fn ensure_buckets(&self) -> PipelineResult<()> {
        for bucket in KNOWN_BUCKETS {
            if self.s3_client.head_bucket().bucket(bucket).send().await.is_ok() {
                info!("Bucket already exists: {}", bucket);
                continue;
            }

            self.s3_client
                .create_bucket()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| PipelineError::Upload {
                    key: bucket.to_string(),
                    message: format!("failed to create bucket: {}", e),
                })?;
            info!("Created bucket: {}", bucket);
        }

        Ok(())
    }

    async fn retrieval_url(&self, bucket: &str, object_key: &str, key: &str) -> PipelineResult<String> {
        if let Some(base) = &self.cdn_base_url {
            return Ok(format!("{}/{}", base, key));
        }

        let presigning = PresigningConfig::expires_in(self.url_expiry).map_err(|e| {
            PipelineError::Upload {
                key: key.to_string(),
                message: format!("invalid presign expiry: {}", e),
            }
        })?;

        let request = self
            .s3_client
            .get_object()
            .bucket(bucket)
            .key(object_key)
            .response_content_disposition("inline")
            .presigned(presigning)
            .await
            .map_err(|e| PipelineError::Upload {
                key: key.to_string(),
                message: format!("failed to presign: {}", e),
            })?;

        Ok(request.uri().to_string())
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> PipelineResult<UploadedBlob> {
        let (bucket, object_key) = split_key(key)?;

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| PipelineError::Upload {
                key: key.to_string(),
                message: format!("cannot read {}: {}", local_path.display(), e),
            })?;

        self.s3_client
            .put_object()
            .bucket(bucket)
            .key(object_key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| PipelineError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let url = self.retrieval_url(bucket, object_key, key).await?;
        Ok(UploadedBlob {
            key: key.to_string(),
            url,
        })
    }

    async fn download(&self, key: &str) -> PipelineResult<Vec<u8>> {
        let (bucket, object_key) = split_key(key)?;
        info!("Downloading s3://{}/{}", bucket, object_key);

        let response = self
            .s3_client
            .get_object()
            .bucket(bucket)
            .key(object_key)
            .send()
            .await
            .map_err(|e| PipelineError::Download {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| PipelineError::Download {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(body.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> PipelineResult<()> {
        let (bucket, object_key) = split_key(key)?;

        self.s3_client
            .delete_object()
            .bucket(bucket)
            .key(object_key)
            .send()
            .await
            .map_err(|e| PipelineError::Delete {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn stat(&self, key: &str) -> PipelineResult<Option<BlobStat>> {
        let (bucket, object_key) = split_key(key)?;

        match self
            .s3_client
            .head_object()
            .bucket(bucket)
            .key(object_key)
            .send()
            .await
        {
            Ok(head) => Ok(Some(BlobStat {
                size: head.content_length().unwrap_or(0).max(0) as u64,
                content_type: head
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string(),
                last_modified: head
                    .last_modified()
                    .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
            })),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|service| service.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Ok(None)
                } else {
                    warn!("stat {} failed: {}", key, e);
                    Err(PipelineError::Download {
                        key: key.to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }
    }
}
