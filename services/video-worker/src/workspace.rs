use crate::error::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use uuid::Uuid;

/// Temporary directory owned by one job.
///
/// Call [`JobWorkspace::cleanup`] when done. Dropping a workspace that was not
/// cleaned up (panic, cancelled task) removes it synchronously instead.
#[derive(Debug)]
pub struct JobWorkspace {
    root: PathBuf,
    cleaned: bool,
}

impl JobWorkspace {
    /// Create a fresh `{temp_root}/{job_id}` directory, clearing leftovers
    /// from an earlier crashed run of the same job.
    pub async fn create(temp_root: &Path, job_id: Uuid) -> PipelineResult<Self> {
        let root = temp_root.join(job_id.to_string());

        if tokio::fs::try_exists(&root).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&root)
                .await
                .map_err(|e| PipelineError::io(&root, e))?;
        }
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| PipelineError::io(&root, e))?;

        debug!("Created workspace {}", root.display());
        Ok(Self {
            root,
            cleaned: false,
        })
    }

    /// Remove the directory without blocking the runtime. Failures are
    /// logged, never returned.
    pub async fn cleanup(mut self) {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!("Removed workspace {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!("Error cleaning up workspace {}: {}", self.root.display(), e),
        }
        self.cleaned = true;
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn source_path(&self) -> PathBuf {
        self.root.join("source.mp4")
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => debug!("Removed workspace {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!("Error cleaning up workspace {}: {}", self.root.display(), e),
        }
    }
}
