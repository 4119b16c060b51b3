use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Processing state of a video job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Ready,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Ready => "ready",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "ready" => Ok(JobStatus::Ready),
            "error" => Ok(JobStatus::Error),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// One published rendition of a job, in ladder order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionInfo {
    pub resolution_label: String,
    pub bitrate_label: String,
}

/// Free-text plant analysis. Either half may be missing when the model
/// response did not contain it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_analysis: Option<String>,
}

impl AiResult {
    pub fn is_empty(&self) -> bool {
        self.health_analysis.is_none() && self.growth_analysis.is_none()
    }
}

/// Durable record for one uploaded video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub source_key: String,
    pub title: String,
    pub description: Option<String>,
    pub master_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub renditions: Option<Vec<RenditionInfo>>,
    pub ai_result: Option<AiResult>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoJob {
    /// A freshly uploaded job, as the upload handler stores it.
    pub fn pending(source_key: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            source_key: source_key.into(),
            title: title.into(),
            description: None,
            master_url: None,
            thumbnail_url: None,
            duration_seconds: None,
            width: None,
            height: None,
            renditions: None,
            ai_result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update applied by `JobRepository::update`. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub master_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub renditions: Option<Vec<RenditionInfo>>,
    pub ai_result: Option<AiResult>,
    pub error_message: Option<String>,
}

impl JobUpdate {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, job: &mut VideoJob) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(url) = &self.master_url {
            job.master_url = Some(url.clone());
        }
        if let Some(url) = &self.thumbnail_url {
            job.thumbnail_url = Some(url.clone());
        }
        if let Some(duration) = self.duration_seconds {
            job.duration_seconds = Some(duration);
        }
        if let Some(width) = self.width {
            job.width = Some(width);
        }
        if let Some(height) = self.height {
            job.height = Some(height);
        }
        if let Some(renditions) = &self.renditions {
            job.renditions = Some(renditions.clone());
        }
        if let Some(ai_result) = &self.ai_result {
            job.ai_result = Some(ai_result.clone());
        }
        if let Some(message) = &self.error_message {
            job.error_message = Some(message.clone());
        }
        job.updated_at = Utc::now();
    }
}

/// Technical metadata read from the source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeMetadata {
    pub duration_seconds: u64,
    pub width: u32,
    pub height: u32,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub format: Option<String>,
}

/// A still frame on local disk together with the key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSample {
    pub path: PathBuf,
    pub storage_key: String,
}

impl FrameSample {
    pub fn new(job_id: Uuid, path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            storage_key: format!("frames/{}/{}", job_id, file_name),
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [JobStatus::Pending, JobStatus::Ready, JobStatus::Error] {
            assert_eq!(status.as_str().parse::<JobStatus>(), Ok(status));
        }
        assert!("processing".parse::<JobStatus>().is_err());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }

    #[test]
    fn failed_update_only_touches_status_and_message() {
        let mut job = VideoJob::pending("uploads/u1/j1/original.mp4", "Monstera");
        JobUpdate::failed("boom").apply_to(&mut job);

        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
        assert_eq!(job.source_key, "uploads/u1/j1/original.mp4");
        assert!(job.master_url.is_none());
        assert!(job.renditions.is_none());
    }

    #[test]
    fn frame_sample_key_is_scoped_to_job() {
        let id = Uuid::new_v4();
        let frame = FrameSample::new(id, PathBuf::from("/tmp/x/frames/frame_0003.jpg"));
        assert_eq!(frame.storage_key, format!("frames/{}/frame_0003.jpg", id));
    }

    #[test]
    fn empty_ai_result_serializes_to_empty_object() {
        let json = serde_json::to_value(AiResult::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
