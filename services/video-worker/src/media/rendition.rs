//! Adaptive bitrate ladder and HLS packaging

use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Segment length for every rendition, in seconds.
pub const SEGMENT_SECONDS: u32 = 6;

pub const MASTER_MANIFEST_NAME: &str = "master.m3u8";
pub const PLAYLIST_NAME: &str = "playlist.m3u8";
pub const SEGMENT_PATTERN: &str = "segment_%03d.ts";

const AUDIO_CODEC: &str = "aac";
const AUDIO_BITRATE: &str = "128k";
const AUDIO_CHANNELS: &str = "2";
const AUDIO_SAMPLE_RATE: &str = "48000";

/// One rung of the bitrate ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionSpec {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub video_bitrate_kbps: u32,
    pub max_bitrate_kbps: u32,
    pub buffer_size_kbps: u32,
    pub profile: &'static str,
    pub output_directory: &'static str,
    pub segment_pattern: &'static str,
}

impl RenditionSpec {
    const fn preset(
        label: &'static str,
        width: u32,
        height: u32,
        video_bitrate_kbps: u32,
        profile: &'static str,
    ) -> Self {
        Self {
            label,
            width,
            height,
            video_bitrate_kbps,
            // 7% headroom over the target, 1.5x buffer
            max_bitrate_kbps: video_bitrate_kbps * 107 / 100,
            buffer_size_kbps: video_bitrate_kbps * 3 / 2,
            profile,
            output_directory: label,
            segment_pattern: SEGMENT_PATTERN,
        }
    }

    /// `WxH`
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// `6000k`
    pub fn bitrate_label(&self) -> String {
        format!("{}k", self.video_bitrate_kbps)
    }

    /// HLS BANDWIDTH attribute, bits per second.
    pub fn bandwidth(&self) -> u64 {
        u64::from(self.video_bitrate_kbps) * 1000
    }

    /// Playlist path relative to the job's working directory.
    pub fn playlist_path(&self) -> String {
        format!("{}/{}", self.output_directory, PLAYLIST_NAME)
    }

    pub fn output_dir(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(self.output_directory)
    }

    /// ffmpeg arguments that encode `input` into this rendition's HLS output.
    pub fn ffmpeg_args(&self, input: &Path, work_dir: &Path) -> Vec<String> {
        let out_dir = self.output_dir(work_dir);
        let scale = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
            w = self.width,
            h = self.height
        );

        let input = input.to_string_lossy();
        let video_bitrate = format!("{}k", self.video_bitrate_kbps);
        let max_bitrate = format!("{}k", self.max_bitrate_kbps);
        let buffer_size = format!("{}k", self.buffer_size_kbps);
        let key_frames = format!("expr:gte(t,n_forced*{})", SEGMENT_SECONDS);
        let segment_seconds = SEGMENT_SECONDS.to_string();
        let segment_file = out_dir.join(self.segment_pattern);
        let segment_file = segment_file.to_string_lossy();
        let playlist = out_dir.join(PLAYLIST_NAME);
        let playlist = playlist.to_string_lossy();

        let args: [&str; 41] = [
            "-hide_banner",
            "-nostdin",
            "-nostats",
            "-loglevel",
            "error",
            "-y",
            "-i",
            &*input,
            "-vf",
            scale.as_str(),
            "-c:v",
            "libx264",
            "-profile:v",
            self.profile,
            "-preset",
            "veryfast",
            "-b:v",
            video_bitrate.as_str(),
            "-maxrate",
            max_bitrate.as_str(),
            "-bufsize",
            buffer_size.as_str(),
            "-force_key_frames",
            key_frames.as_str(),
            "-c:a",
            AUDIO_CODEC,
            "-b:a",
            AUDIO_BITRATE,
            "-ac",
            AUDIO_CHANNELS,
            "-ar",
            AUDIO_SAMPLE_RATE,
            "-f",
            "hls",
            "-hls_time",
            segment_seconds.as_str(),
            "-hls_playlist_type",
            "vod",
            "-hls_segment_filename",
            &*segment_file,
            &*playlist,
        ];

        args.iter().map(|arg| arg.to_string()).collect()
    }
}

/// The five fixed presets, highest quality first.
pub fn default_ladder() -> Vec<RenditionSpec> {
    vec![
        RenditionSpec::preset("1080p", 1920, 1080, 6000, "high"),
        RenditionSpec::preset("720p", 1280, 720, 3000, "main"),
        RenditionSpec::preset("480p", 854, 480, 1500, "main"),
        RenditionSpec::preset("360p", 640, 360, 800, "baseline"),
        RenditionSpec::preset("240p", 426, 240, 400, "baseline"),
    ]
}

/// Master playlist listing `specs` in the given order.
pub fn generate_master_manifest(specs: &[RenditionSpec]) -> String {
    let mut manifest = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
    for spec in specs {
        let _ = writeln!(
            manifest,
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}",
            spec.bandwidth(),
            spec.resolution()
        );
        let _ = writeln!(manifest, "{}", spec.playlist_path());
    }
    manifest
}
