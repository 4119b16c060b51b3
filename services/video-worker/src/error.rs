//! Error types for the video processing pipeline

use common::error::DatabaseError;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure a pipeline stage can surface to the orchestrator.
///
/// The `Display` text of these variants is what ends up in a job's
/// `error_message`, so messages are written for humans.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Frame extraction failed: {0}")]
    Extraction(String),

    #[error("Transcode of {rendition} failed: {message}")]
    Transcode { rendition: String, message: String },

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Download of {key} failed: {message}")]
    Download { key: String, message: String },

    #[error("Upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("Delete of {key} failed: {message}")]
    Delete { key: String, message: String },

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("{tool} timed out after {seconds} seconds")]
    Timeout { tool: String, seconds: u64 },

    #[error("Invalid storage key {0}")]
    InvalidKey(String),

    #[error("Repository error: {0}")]
    Repository(#[from] DatabaseError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Type alias for Result with PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;
