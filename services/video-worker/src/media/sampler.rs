use crate::error::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};

/// Seconds between sampled frames.
pub const FRAME_INTERVAL_SECS: u32 = 2;

/// Width of the generated thumbnail; height follows the aspect ratio.
pub const THUMBNAIL_WIDTH: u32 = 720;

const FRAME_PREFIX: &str = "frame_";

/// ffmpeg arguments that write one JPEG every `FRAME_INTERVAL_SECS`.
pub fn frame_args(input: &Path, output_dir: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-vf".to_string(),
        format!("fps=1/{}", FRAME_INTERVAL_SECS),
        "-q:v".to_string(),
        "2".to_string(),
        output_dir
            .join(format!("{}%04d.jpg", FRAME_PREFIX))
            .to_string_lossy()
            .into_owned(),
    ]
}

/// ffmpeg arguments that grab one scaled frame at `at_seconds`.
pub fn thumbnail_args(input: &Path, output: &Path, at_seconds: u64) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-ss".to_string(),
        at_seconds.to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-vframes".to_string(),
        "1".to_string(),
        "-vf".to_string(),
        format!("scale={}:-2", THUMBNAIL_WIDTH),
        "-f".to_string(),
        "image2".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// The frames written by `frame_args`, in playback order.
pub async fn collect_frames(output_dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(output_dir)
        .await
        .map_err(|e| PipelineError::io(output_dir, e))?;

    let mut frames = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PipelineError::io(output_dir, e))?
    {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(FRAME_PREFIX) && name.ends_with(".jpg") {
            frames.push(entry.path());
        }
    }

    // zero-padded names sort in playback order
    frames.sort();
    Ok(frames)
}

/// Timestamp used for the thumbnail: the middle of the clip.
pub fn thumbnail_timestamp(duration_seconds: u64) -> u64 {
    duration_seconds / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_filter_samples_every_two_seconds() {
        let args = frame_args(Path::new("/w/source.mp4"), Path::new("/w/frames"));
        assert!(args.contains(&"fps=1/2".to_string()));
        assert_eq!(args.last().unwrap(), "/w/frames/frame_%04d.jpg");
    }

    #[test]
    fn thumbnail_seeks_before_input() {
        let args = thumbnail_args(Path::new("in.mp4"), Path::new("thumb.jpg"), 6);
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[ss + 1], "6");
        assert!(args.contains(&"scale=720:-2".to_string()));
    }

    #[test]
    fn thumbnail_is_taken_mid_clip() {
        assert_eq!(thumbnail_timestamp(12), 6);
        assert_eq!(thumbnail_timestamp(0), 0);
        assert_eq!(thumbnail_timestamp(1), 0);
    }

    #[tokio::test]
    async fn collect_frames_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_0003.jpg", "frame_0001.jpg", "frame_0002.jpg", "other.jpg", "frame_0004.png"] {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }

        let frames = collect_frames(dir.path()).await.unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["frame_0001.jpg", "frame_0002.jpg", "frame_0003.jpg"]);
    }

    #[tokio::test]
    async fn empty_directory_yields_no_frames() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_frames(dir.path()).await.unwrap().is_empty());
    }
}
