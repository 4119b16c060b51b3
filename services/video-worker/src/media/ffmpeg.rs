use super::command::run_tool;
use super::rendition::RenditionSpec;
use super::{MediaEngine, inspector, sampler};
use crate::error::{PipelineError, PipelineResult};
use crate::models::ProbeMetadata;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// `MediaEngine` backed by the ffmpeg and ffprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg_path: String,
    ffprobe_path: String,
    probe_timeout: Duration,
    encode_timeout: Duration,
}

impl FfmpegEngine {
    pub fn new(
        ffmpeg_path: impl Into<String>,
        ffprobe_path: impl Into<String>,
        probe_timeout: Duration,
        encode_timeout: Duration,
    ) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            probe_timeout,
            encode_timeout,
        }
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn probe(&self, input: &Path) -> PipelineResult<ProbeMetadata> {
        info!("Extracting metadata from file: {}", input.display());

        let output = run_tool(
            &self.ffprobe_path,
            &inspector::probe_args(input),
            self.probe_timeout,
            PipelineError::Probe,
        )
        .await?;

        let metadata = inspector::parse_probe_stdout(&output.stdout)?;
        info!(
            "Probed {}: {}s {}x{} video={:?} audio={:?} format={:?}",
            input.display(),
            metadata.duration_seconds,
            metadata.width,
            metadata.height,
            metadata.video_codec,
            metadata.audio_codec,
            metadata.format
        );
        Ok(metadata)
    }

    async fn extract_frames(&self, input: &Path, output_dir: &Path) -> PipelineResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| PipelineError::io(output_dir, e))?;

        run_tool(
            &self.ffmpeg_path,
            &sampler::frame_args(input, output_dir),
            self.encode_timeout,
            PipelineError::Extraction,
        )
        .await?;

        let frames = sampler::collect_frames(output_dir).await?;
        info!("Extracted {} frames from {}", frames.len(), input.display());
        Ok(frames)
    }

    async fn thumbnail(&self, input: &Path, output: &Path, at_seconds: u64) -> PipelineResult<()> {
        info!("Generating thumbnail at {}s for {}", at_seconds, input.display());

        run_tool(
            &self.ffmpeg_path,
            &sampler::thumbnail_args(input, output, at_seconds),
            self.probe_timeout,
            PipelineError::Extraction,
        )
        .await?;

        Ok(())
    }

    async fn transcode(&self, input: &Path, spec: &RenditionSpec, work_dir: &Path) -> PipelineResult<()> {
        let out_dir = spec.output_dir(work_dir);
        tokio::fs::create_dir_all(&out_dir)
            .await
            .map_err(|e| PipelineError::io(&out_dir, e))?;

        info!(
            "Transcoding to {}: {} @ {}kbps",
            spec.label,
            spec.resolution(),
            spec.video_bitrate_kbps
        );

        run_tool(
            &self.ffmpeg_path,
            &spec.ffmpeg_args(input, work_dir),
            self.encode_timeout,
            |message| PipelineError::Transcode {
                rendition: spec.label.to_string(),
                message,
            },
        )
        .await?;

        Ok(())
    }
}
