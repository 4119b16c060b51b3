//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use video_worker::ai::AnalysisClient;
use video_worker::error::{PipelineError, PipelineResult};
use video_worker::media::rendition::PLAYLIST_NAME;
use video_worker::media::{MediaEngine, RenditionSpec, default_ladder};
use video_worker::models::{AiResult, ProbeMetadata, VideoJob};
use video_worker::orchestrator::Orchestrator;
use video_worker::pipeline::VideoPipeline;
use video_worker::repository::MemoryJobRepository;
use video_worker::storage::MemoryBlobStore;

/// Stands in for ffmpeg: writes plausible files for a source of the given
/// length and dimensions.
pub struct ScriptedEngine {
    pub duration_seconds: u64,
    pub width: u32,
    pub height: u32,
    pub fail_rendition: Option<&'static str>,
    pub encode_delay: Duration,
}

impl ScriptedEngine {
    pub fn new(duration_seconds: u64, width: u32, height: u32) -> Self {
        Self {
            duration_seconds,
            width,
            height,
            fail_rendition: None,
            encode_delay: Duration::ZERO,
        }
    }

    pub fn failing(mut self, label: &'static str) -> Self {
        self.fail_rendition = Some(label);
        self
    }

    pub fn with_encode_delay(mut self, delay: Duration) -> Self {
        self.encode_delay = delay;
        self
    }
}

#[async_trait]
impl MediaEngine for ScriptedEngine {
    async fn probe(&self, input: &Path) -> PipelineResult<ProbeMetadata> {
        if !input.exists() {
            return Err(PipelineError::Probe(format!("{} missing", input.display())));
        }
        Ok(ProbeMetadata {
            duration_seconds: self.duration_seconds,
            width: self.width,
            height: self.height,
            video_codec: Some("h264".to_string()),
            audio_codec: Some("aac".to_string()),
            format: Some("mov,mp4,m4a,3gp,3g2,mj2".to_string()),
        })
    }

    async fn extract_frames(&self, _input: &Path, output_dir: &Path) -> PipelineResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(output_dir).await.unwrap();
        let mut frames = Vec::new();
        for index in 1..=self.duration_seconds / 2 {
            let path = output_dir.join(format!("frame_{:04}.jpg", index));
            tokio::fs::write(&path, b"jpeg").await.unwrap();
            frames.push(path);
        }
        Ok(frames)
    }

    async fn thumbnail(&self, _input: &Path, output: &Path, _at_seconds: u64) -> PipelineResult<()> {
        tokio::fs::write(output, b"thumbnail").await.unwrap();
        Ok(())
    }

    async fn transcode(&self, _input: &Path, spec: &RenditionSpec, work_dir: &Path) -> PipelineResult<()> {
        if self.fail_rendition == Some(spec.label) {
            return Err(PipelineError::Transcode {
                rendition: spec.label.to_string(),
                message: "encoder exploded".to_string(),
            });
        }

        tokio::time::sleep(self.encode_delay).await;

        let dir = spec.output_dir(work_dir);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join(PLAYLIST_NAME), b"#EXTM3U\n").await.unwrap();
        for segment in 0..2 {
            tokio::fs::write(dir.join(format!("segment_{:03}.ts", segment)), b"ts")
                .await
                .unwrap();
        }
        Ok(())
    }
}

/// Analysis endpoint with canned answers.
#[derive(Default)]
pub struct CannedAnalysis {
    pub fail_summary: bool,
    /// Image URLs containing this text fail analysis.
    pub fail_image: Option<&'static str>,
    /// Append the frame's file name to the health analysis.
    pub tag_frames: bool,
    pub images_seen: AtomicUsize,
}

#[async_trait]
impl AnalysisClient for CannedAnalysis {
    async fn analyze_image(&self, image_url: &str) -> PipelineResult<AiResult> {
        self.images_seen.fetch_add(1, Ordering::SeqCst);
        if self.fail_image.is_some_and(|pattern| image_url.contains(pattern)) {
            return Err(PipelineError::Analysis(format!("cannot analyse {}", image_url)));
        }
        let mut health = "Healthy, no pests.".to_string();
        if self.tag_frames {
            let file_name = image_url.rsplit('/').next().unwrap_or(image_url);
            health = format!("{} ({})", health, file_name);
        }
        Ok(AiResult {
            health_analysis: Some(health),
            growth_analysis: Some("8 leaves".to_string()),
        })
    }

    async fn summarize(&self, _prompt: &str) -> PipelineResult<String> {
        if self.fail_summary {
            return Err(PipelineError::Analysis("endpoint unavailable".to_string()));
        }
        Ok("Health Analysis: Healthy overall.\nGrowth Analysis: 8 leaves, steady.".to_string())
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub repository: MemoryJobRepository,
    pub blob_store: MemoryBlobStore,
    pub analysis: Arc<CannedAnalysis>,
    pub temp_root: TempDir,
}

impl Harness {
    pub fn new(engine: ScriptedEngine) -> Self {
        Self::with_analysis(engine, CannedAnalysis::default())
    }

    pub fn with_analysis(engine: ScriptedEngine, analysis: CannedAnalysis) -> Self {
        let repository = MemoryJobRepository::new();
        let blob_store = MemoryBlobStore::new();
        let analysis = Arc::new(analysis);
        let temp_root = tempfile::tempdir().unwrap();

        let pipeline = VideoPipeline::new(
            Arc::new(engine),
            Arc::new(blob_store.clone()),
            analysis.clone(),
            Arc::new(repository.clone()),
            default_ladder(),
        );
        let orchestrator = Orchestrator::new(
            Arc::new(repository.clone()),
            Arc::new(blob_store.clone()),
            pipeline,
            temp_root.path(),
        );

        Self {
            orchestrator,
            repository,
            blob_store,
            analysis,
            temp_root,
        }
    }

    /// Store a pending job and its uploaded source.
    pub async fn upload(&self, title: &str) -> VideoJob {
        let job = VideoJob::pending(format!("uploads/u1/{}/original.mp4", title), title);
        self.upload_job(job).await
    }

    pub async fn upload_job(&self, job: VideoJob) -> VideoJob {
        self.blob_store
            .insert(&job.source_key, b"fake mp4".to_vec(), "video/mp4")
            .await;
        self.repository.insert(job.clone()).await;
        job
    }

    pub fn workspace_of(&self, job: &VideoJob) -> PathBuf {
        self.temp_root.path().join(job.id.to_string())
    }
}
