use crate::error::{PipelineError, PipelineResult};
use crate::models::{JobUpdate, VideoJob};
use crate::pipeline::VideoPipeline;
use crate::repository::JobRepository;
use crate::storage::BlobStore;
use crate::workspace::JobWorkspace;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// What one call to [`Orchestrator::run`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain held the busy flag; nothing was done.
    AlreadyRunning,
    Completed { succeeded: usize, failed: usize },
}

/// Drains pending jobs one at a time, oldest first.
///
/// Clones share the busy flag, so at most one drain runs per process no
/// matter how many triggers fire.
#[derive(Clone)]
pub struct Orchestrator {
    repository: Arc<dyn JobRepository>,
    blob_store: Arc<dyn BlobStore>,
    pipeline: VideoPipeline,
    temp_root: PathBuf,
    busy: Arc<AtomicBool>,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Orchestrator {
    pub fn new(
        repository: Arc<dyn JobRepository>,
        blob_store: Arc<dyn BlobStore>,
        pipeline: VideoPipeline,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repository,
            blob_store,
            pipeline,
            temp_root: temp_root.into(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Process pending jobs until none is left.
    ///
    /// A failed job is recorded as `error` and the drain moves on. A failure
    /// to record that error, or to query for work, ends the drain early.
    pub async fn run(&self) -> PipelineResult<DrainOutcome> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("A drain is already running, skipping");
            return Ok(DrainOutcome::AlreadyRunning);
        }
        let _guard = BusyGuard(&self.busy);

        let mut succeeded = 0;
        let mut failed = 0;

        while let Some(job) = self.repository.find_oldest_pending().await? {
            if self.process_job(&job).await? {
                succeeded += 1;
            } else {
                failed += 1;
            }
        }

        if succeeded + failed > 0 {
            info!("Drain finished: {} ready, {} failed", succeeded, failed);
        }
        Ok(DrainOutcome::Completed { succeeded, failed })
    }

    /// `Ok(true)` when the job became ready, `Ok(false)` when its failure was
    /// recorded.
    async fn process_job(&self, job: &VideoJob) -> PipelineResult<bool> {
        info!("Processing job {} ({})", job.id, job.source_key);

        match self.execute(job).await {
            Ok(()) => {
                if let Err(e) = self.blob_store.delete(&job.source_key).await {
                    warn!("Could not delete source {} of job {}: {}", job.source_key, job.id, e);
                }
                Ok(true)
            }
            Err(e) => {
                error!("Job {} failed: {}", job.id, e);
                self.repository
                    .update(job.id, JobUpdate::failed(e.to_string()))
                    .await
                    .inspect_err(|write_error| {
                        error!("Could not record failure of job {}: {}", job.id, write_error)
                    })?;
                Ok(false)
            }
        }
    }

    /// Download the source into a fresh workspace and run the pipeline. The
    /// workspace is removed when this returns, whatever the outcome.
    async fn execute(&self, job: &VideoJob) -> PipelineResult<()> {
        let workspace = JobWorkspace::create(&self.temp_root, job.id).await?;
        let result = self.download_and_process(job, &workspace).await;
        workspace.cleanup().await;
        result
    }

    async fn download_and_process(&self, job: &VideoJob, workspace: &JobWorkspace) -> PipelineResult<()> {
        let bytes = self.blob_store.download(&job.source_key).await?;
        let source = workspace.source_path();
        tokio::fs::write(&source, &bytes)
            .await
            .map_err(|e| PipelineError::io(&source, e))?;
        drop(bytes);

        self.pipeline.process(job, workspace).await
    }

    /// Trigger a drain on every tick of the cron `schedule`. Ticks that land
    /// while a drain is running are no-ops.
    pub async fn start_polling(&self, schedule: &str) -> Result<JobScheduler> {
        let orchestrator = self.clone();

        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_, _| {
            let orchestrator = orchestrator.clone();
            Box::pin(async move {
                if let Err(e) = orchestrator.run().await {
                    error!("Drain stopped: {}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started job polling with schedule: {}", schedule);
        Ok(scheduler)
    }
}
