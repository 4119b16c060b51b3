use crate::ai::{AiResultAggregator, AnalysisClient};
use crate::error::{PipelineError, PipelineResult};
use crate::media::sampler::thumbnail_timestamp;
use crate::media::{MediaEngine, RenditionSpec};
use crate::models::{AiResult, FrameSample, JobStatus, JobUpdate, VideoJob};
use crate::publisher::{ArtifactPublisher, THUMBNAIL_NAME};
use crate::repository::JobRepository;
use crate::storage::BlobStore;
use crate::transcoder::RenditionTranscoder;
use crate::workspace::JobWorkspace;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

/// The per-job processing stages, from probe to the final `ready` write.
#[derive(Clone)]
pub struct VideoPipeline {
    engine: Arc<dyn MediaEngine>,
    blob_store: Arc<dyn BlobStore>,
    analysis_client: Arc<dyn AnalysisClient>,
    repository: Arc<dyn JobRepository>,
    transcoder: RenditionTranscoder,
    publisher: ArtifactPublisher,
    aggregator: AiResultAggregator,
    ladder: Vec<RenditionSpec>,
}

impl VideoPipeline {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        blob_store: Arc<dyn BlobStore>,
        analysis_client: Arc<dyn AnalysisClient>,
        repository: Arc<dyn JobRepository>,
        ladder: Vec<RenditionSpec>,
    ) -> Self {
        Self {
            transcoder: RenditionTranscoder::new(Arc::clone(&engine)),
            publisher: ArtifactPublisher::new(Arc::clone(&blob_store)),
            aggregator: AiResultAggregator::new(Arc::clone(&analysis_client)),
            engine,
            blob_store,
            analysis_client,
            repository,
            ladder,
        }
    }

    /// Process the source already downloaded into `workspace` and write the
    /// job's `ready` record. Errors are returned untouched; recording them is
    /// the orchestrator's job.
    pub async fn process(&self, job: &VideoJob, workspace: &JobWorkspace) -> PipelineResult<()> {
        let source = workspace.source_path();

        let metadata = self.engine.probe(&source).await?;

        let frames: Vec<FrameSample> = self
            .engine
            .extract_frames(&source, &workspace.frames_dir())
            .await?
            .into_iter()
            .map(|path| FrameSample::new(job.id, path))
            .collect();

        // analysis never fails the job, so only the transcode can short-circuit
        let (ai_result, renditions) = tokio::try_join!(
            async { Ok::<_, PipelineError>(self.analyze_frames(job.id, &frames).await) },
            self.transcoder
                .transcode_all(&source, workspace.path(), &self.ladder),
        )?;

        self.engine
            .thumbnail(
                &source,
                &workspace.path().join(THUMBNAIL_NAME),
                thumbnail_timestamp(metadata.duration_seconds),
            )
            .await?;

        let published = self
            .publisher
            .publish_all(workspace.path(), job.id, &self.ladder)
            .await?;

        let update = JobUpdate {
            status: Some(JobStatus::Ready),
            master_url: Some(published.manifest_url),
            thumbnail_url: published.thumbnail_url,
            duration_seconds: Some(metadata.duration_seconds as i64),
            width: Some(metadata.width as i32),
            height: Some(metadata.height as i32),
            renditions: Some(renditions),
            ai_result,
            error_message: None,
        };
        self.repository.update(job.id, update).await?;

        info!("Job {} is ready", job.id);
        Ok(())
    }

    /// Upload and analyse every frame concurrently, then aggregate.
    ///
    /// Frames that fail to upload or analyse are skipped, so the aggregator's
    /// first-frame fallback means the first frame that was analysed, which is
    /// not necessarily `frame_0001`. Returns `None` when frames existed but
    /// none could be analysed.
    async fn analyze_frames(&self, job_id: Uuid, frames: &[FrameSample]) -> Option<AiResult> {
        let mut tasks = JoinSet::new();

        for (index, frame) in frames.iter().cloned().enumerate() {
            let blob_store = Arc::clone(&self.blob_store);
            let client = Arc::clone(&self.analysis_client);
            tasks.spawn(async move {
                let uploaded = blob_store
                    .upload(&frame.path, &frame.storage_key, "image/jpeg")
                    .await?;
                let result = client.analyze_image(&uploaded.url).await?;
                Ok::<_, PipelineError>((index, result))
            });
        }

        let mut per_frame: Vec<(usize, AiResult)> = Vec::with_capacity(frames.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(entry)) => per_frame.push(entry),
                Ok(Err(e)) => warn!("Frame analysis failed for job {}: {}", job_id, e),
                Err(e) => warn!("Frame analysis task for job {} died: {}", job_id, e),
            }
        }

        if !frames.is_empty() && per_frame.is_empty() {
            warn!("No frame of job {} could be analysed", job_id);
            return None;
        }

        per_frame.sort_by_key(|(index, _)| *index);
        let results: Vec<AiResult> = per_frame.into_iter().map(|(_, result)| result).collect();
        Some(self.aggregator.aggregate(&results).await)
    }
}
