use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Worker settings, read from `WORKER_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    // Scheduling
    pub polling_schedule: String,
    pub temp_root: PathBuf,

    // Admin HTTP surface
    pub admin_bind_address: String,

    // Media engine
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub probe_timeout_secs: u64,
    pub encode_timeout_secs: u64,

    // Object storage
    pub s3_endpoint: Option<String>,
    pub s3_force_path_style: bool,
    pub cdn_base_url: Option<String>,
    pub presigned_url_expiry_secs: u64,

    // AI endpoint
    pub ai_endpoint: String,
    pub ai_api_key: String,
    pub ai_model: String,
    pub ai_max_tokens: u32,
    pub ai_temperature: f32,
    pub ai_timeout_secs: u64,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let default_temp = std::env::temp_dir().join("video-processing");

        let config = config::Config::builder()
            .set_default("polling_schedule", "0/30 * * * * *")? // every 30 seconds
            .set_default("temp_root", default_temp.to_string_lossy().into_owned())?
            .set_default("admin_bind_address", "0.0.0.0:3002")?
            .set_default("ffmpeg_path", "ffmpeg")?
            .set_default("ffprobe_path", "ffprobe")?
            .set_default("probe_timeout_secs", 60)?
            .set_default("encode_timeout_secs", 3600)? // 1 hour per rendition
            .set_default("s3_force_path_style", false)?
            .set_default("presigned_url_expiry_secs", 7 * 24 * 60 * 60)? // 7 days
            .set_default("ai_endpoint", "https://api.openai.com/v1/chat/completions")?
            .set_default("ai_api_key", "")?
            .set_default("ai_model", "gpt-4o")?
            .set_default("ai_max_tokens", 1000)?
            .set_default("ai_temperature", 0.7)?
            .set_default("ai_timeout_secs", 120)?
            .add_source(config::Environment::with_prefix("WORKER").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling_schedule.trim().is_empty() {
            return Err(anyhow!("Polling schedule is required"));
        }

        if self.probe_timeout_secs == 0 || self.encode_timeout_secs == 0 {
            return Err(anyhow!("Media engine timeouts must be greater than 0"));
        }

        // S3 presigned URLs cannot outlive 7 days
        if self.presigned_url_expiry_secs == 0 || self.presigned_url_expiry_secs > 604_800 {
            return Err(anyhow!(
                "Presigned URL expiry must be between 1 and 604800 seconds"
            ));
        }

        if self.ai_endpoint.is_empty() {
            return Err(anyhow!("AI endpoint is required"));
        }

        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn encode_timeout(&self) -> Duration {
        Duration::from_secs(self.encode_timeout_secs)
    }

    pub fn presigned_url_expiry(&self) -> Duration {
        Duration::from_secs(self.presigned_url_expiry_secs)
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
}
