use crate::error::{PipelineError, PipelineResult};
use crate::media::RenditionSpec;
use crate::media::rendition::{MASTER_MANIFEST_NAME, PLAYLIST_NAME};
use crate::storage::{BlobStore, content_type_for};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const THUMBNAIL_NAME: &str = "thumbnail.jpg";

/// URLs of everything uploaded for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifacts {
    pub manifest_url: String,
    pub thumbnail_url: Option<String>,
    /// Relative path inside the working directory -> retrieval URL.
    pub urls: BTreeMap<String, String>,
}

/// Uploads a finished working directory to the blob store.
#[derive(Clone)]
pub struct ArtifactPublisher {
    blob_store: Arc<dyn BlobStore>,
}

impl ArtifactPublisher {
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self { blob_store }
    }

    /// Upload the manifest, every rendition's playlist and segments (ladder
    /// order), then the thumbnail. Stops at the first failed upload.
    pub async fn publish_all(
        &self,
        work_dir: &Path,
        job_id: Uuid,
        specs: &[RenditionSpec],
    ) -> PipelineResult<PublishedArtifacts> {
        let artifacts = collect_artifacts(work_dir, specs).await?;
        info!("Publishing {} artifacts for job {}", artifacts.len(), job_id);

        let mut urls = BTreeMap::new();
        for relative in &artifacts {
            let local = work_dir.join(relative);
            let key = if relative == THUMBNAIL_NAME {
                format!("thumbnails/{}.jpg", job_id)
            } else {
                format!("videos/{}/{}", job_id, relative)
            };

            let uploaded = self
                .blob_store
                .upload(&local, &key, content_type_for(&local))
                .await
                .map_err(|e| PipelineError::Publish(e.to_string()))?;
            urls.insert(relative.clone(), uploaded.url);
        }

        let manifest_url = urls
            .get(MASTER_MANIFEST_NAME)
            .cloned()
            .ok_or_else(|| PipelineError::Publish("master manifest URL missing".to_string()))?;
        let thumbnail_url = urls.get(THUMBNAIL_NAME).cloned();

        Ok(PublishedArtifacts {
            manifest_url,
            thumbnail_url,
            urls,
        })
    }
}

/// Relative paths of the artifacts to upload, in upload order.
async fn collect_artifacts(work_dir: &Path, specs: &[RenditionSpec]) -> PipelineResult<Vec<String>> {
    if !tokio::fs::try_exists(work_dir.join(MASTER_MANIFEST_NAME))
        .await
        .unwrap_or(false)
    {
        return Err(PipelineError::Publish(format!(
            "{} not found in {}",
            MASTER_MANIFEST_NAME,
            work_dir.display()
        )));
    }

    let mut artifacts = vec![MASTER_MANIFEST_NAME.to_string()];

    for spec in specs {
        artifacts.push(spec.playlist_path());
        for segment in list_segments(&spec.output_dir(work_dir)).await? {
            artifacts.push(format!("{}/{}", spec.output_directory, segment));
        }
    }

    if tokio::fs::try_exists(work_dir.join(THUMBNAIL_NAME))
        .await
        .unwrap_or(false)
    {
        artifacts.push(THUMBNAIL_NAME.to_string());
    }

    Ok(artifacts)
}

async fn list_segments(dir: &Path) -> PipelineResult<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| PipelineError::Publish(format!("cannot read {}: {}", dir.display(), e)))?;

    let mut segments = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PipelineError::io(PathBuf::from(dir), e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name != PLAYLIST_NAME && name.ends_with(".ts") {
            segments.push(name);
        }
    }
    segments.sort();
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::default_ladder;
    use crate::storage::MemoryBlobStore;

    async fn write_ladder(work_dir: &Path, specs: &[RenditionSpec]) {
        tokio::fs::write(work_dir.join(MASTER_MANIFEST_NAME), "#EXTM3U\n")
            .await
            .unwrap();
        for spec in specs {
            let dir = spec.output_dir(work_dir);
            tokio::fs::create_dir_all(&dir).await.unwrap();
            tokio::fs::write(dir.join(PLAYLIST_NAME), "#EXTM3U\n").await.unwrap();
            for n in [1, 0] {
                tokio::fs::write(dir.join(format!("segment_{:03}.ts", n)), b"ts")
                    .await
                    .unwrap();
            }
        }
        tokio::fs::write(work_dir.join(THUMBNAIL_NAME), b"jpg").await.unwrap();
    }

    #[tokio::test]
    async fn publishes_everything_under_job_keys() {
        let dir = tempfile::tempdir().unwrap();
        let specs = default_ladder();
        write_ladder(dir.path(), &specs).await;

        let store = MemoryBlobStore::new();
        let publisher = ArtifactPublisher::new(Arc::new(store.clone()));
        let job_id = Uuid::new_v4();

        let published = publisher.publish_all(dir.path(), job_id, &specs).await.unwrap();

        assert_eq!(
            published.manifest_url,
            format!("memory://videos/{}/master.m3u8", job_id)
        );
        assert_eq!(
            published.thumbnail_url.as_deref(),
            Some(format!("memory://thumbnails/{}.jpg", job_id).as_str())
        );
        // manifest + 5 * (playlist + 2 segments) + thumbnail
        assert_eq!(published.urls.len(), 17);
        assert!(store.contains(&format!("videos/{}/240p/segment_001.ts", job_id)).await);
    }

    #[tokio::test]
    async fn upload_order_is_manifest_then_ladder_then_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let specs = default_ladder();
        write_ladder(dir.path(), &specs).await;

        let order = collect_artifacts(dir.path(), &specs).await.unwrap();
        assert_eq!(order[0], "master.m3u8");
        assert_eq!(order[1], "1080p/playlist.m3u8");
        assert_eq!(order[2], "1080p/segment_000.ts");
        assert_eq!(order[3], "1080p/segment_001.ts");
        assert_eq!(order[4], "720p/playlist.m3u8");
        assert_eq!(order.last().unwrap(), "thumbnail.jpg");
    }

    #[tokio::test]
    async fn missing_manifest_is_a_publish_error() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ArtifactPublisher::new(Arc::new(MemoryBlobStore::new()));

        let err = publisher
            .publish_all(dir.path(), Uuid::new_v4(), &default_ladder())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Publish(_)));
    }

    #[tokio::test]
    async fn first_upload_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let specs = default_ladder();
        write_ladder(dir.path(), &specs).await;

        let store = MemoryBlobStore::new();
        store.fail_uploads_under("videos/").await;
        let publisher = ArtifactPublisher::new(Arc::new(store.clone()));

        let err = publisher
            .publish_all(dir.path(), Uuid::new_v4(), &specs)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Publish(ref msg) if msg.contains("master.m3u8")));
        assert_eq!(store.operation_count(), 1);
    }
}
