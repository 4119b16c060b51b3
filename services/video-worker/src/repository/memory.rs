use super::JobRepository;
use crate::error::PipelineResult;
use crate::models::{JobStatus, JobUpdate, VideoJob};
use async_trait::async_trait;
use common::error::DatabaseError;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process job repository for tests and local runs.
///
/// Keeps a log of every update in call order so tests can check processing
/// order and write counts.
#[derive(Clone, Default)]
pub struct MemoryJobRepository {
    jobs: Arc<Mutex<HashMap<Uuid, VideoJob>>>,
    writes: Arc<Mutex<Vec<(Uuid, JobUpdate)>>>,
    fail_updates: Arc<AtomicBool>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: VideoJob) {
        self.jobs.lock().await.insert(job.id, job);
    }

    pub async fn writes(&self) -> Vec<(Uuid, JobUpdate)> {
        self.writes.lock().await.clone()
    }

    /// Make every subsequent `update` fail.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn find_oldest_pending(&self) -> PipelineResult<Option<VideoJob>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .min_by_key(|job| job.created_at)
            .cloned())
    }

    async fn update(&self, id: Uuid, update: JobUpdate) -> PipelineResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DatabaseError::Configuration("updates disabled".to_string()).into());
        }

        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(&id) {
            update.apply_to(job);
        }
        self.writes.lock().await.push((id, update));
        Ok(())
    }

    async fn get(&self, id: Uuid) -> PipelineResult<Option<VideoJob>> {
        Ok(self.jobs.lock().await.get(&id).cloned())
    }
}
