//! External media engine (ffmpeg / ffprobe)
//!
//! `MediaEngine` is the seam between the pipeline and the process-based tool.
//! `FfmpegEngine` is the real implementation; the submodules hold the pure
//! argument builders and output parsers it uses.

use crate::error::PipelineResult;
use crate::models::ProbeMetadata;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod command;
pub mod ffmpeg;
pub mod inspector;
pub mod rendition;
pub mod sampler;

pub use ffmpeg::FfmpegEngine;
pub use rendition::{RenditionSpec, default_ladder, generate_master_manifest};

#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Duration and dimensions of `input`. Fails with `Probe` when there is
    /// no video stream.
    async fn probe(&self, input: &Path) -> PipelineResult<ProbeMetadata>;

    /// Write one still every two seconds into `output_dir` and return their
    /// paths in playback order.
    async fn extract_frames(&self, input: &Path, output_dir: &Path) -> PipelineResult<Vec<PathBuf>>;

    /// Write a single JPEG grabbed at `at_seconds` to `output`.
    async fn thumbnail(&self, input: &Path, output: &Path, at_seconds: u64) -> PipelineResult<()>;

    /// Encode one HLS rendition into `work_dir/{spec.output_directory}`.
    async fn transcode(&self, input: &Path, spec: &RenditionSpec, work_dir: &Path) -> PipelineResult<()>;
}
