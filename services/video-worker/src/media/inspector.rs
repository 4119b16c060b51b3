use crate::error::{PipelineError, PipelineResult};
use crate::models::ProbeMetadata;
use std::path::Path;

/// ffprobe arguments that print format and stream information as JSON.
pub fn probe_args(input: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        input.to_string_lossy().into_owned(),
    ]
}

/// Parse raw ffprobe stdout.
pub fn parse_probe_stdout(stdout: &[u8]) -> PipelineResult<ProbeMetadata> {
    let ffprobe_data: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| PipelineError::Probe(format!("unreadable ffprobe output: {}", e)))?;
    parse_probe_output(&ffprobe_data)
}

/// Extract duration and dimensions from ffprobe JSON.
///
/// Duration is floored to whole seconds; missing values become 0. A file
/// without any video stream is rejected.
pub fn parse_probe_output(ffprobe_data: &serde_json::Value) -> PipelineResult<ProbeMetadata> {
    let mut metadata = ProbeMetadata::default();

    if let Some(format) = ffprobe_data.get("format") {
        if let Some(duration_str) = format.get("duration").and_then(|v| v.as_str()) {
            metadata.duration_seconds = duration_str
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(|d| d.floor() as u64)
                .unwrap_or(0);
        }

        if let Some(format_name) = format.get("format_name").and_then(|v| v.as_str()) {
            metadata.format = Some(format_name.to_string());
        }
    }

    let streams = ffprobe_data
        .get("streams")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let video_stream = streams
        .iter()
        .find(|stream| stream.get("codec_type").and_then(|v| v.as_str()) == Some("video"))
        .ok_or_else(|| PipelineError::Probe("No video stream found".to_string()))?;

    metadata.width = video_stream
        .get("width")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    metadata.height = video_stream
        .get("height")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    metadata.video_codec = video_stream
        .get("codec_name")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    metadata.audio_codec = streams
        .iter()
        .find(|stream| stream.get("codec_type").and_then(|v| v.as_str()) == Some("audio"))
        .and_then(|stream| stream.get("codec_name"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Ok(metadata)
}
