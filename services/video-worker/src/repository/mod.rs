//! Media metadata repository
//!
//! Durable job state. There is no claim or lease on `find_oldest_pending`;
//! the worker relies on being the only instance polling.

use crate::error::PipelineResult;
use crate::models::{JobUpdate, VideoJob};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryJobRepository;
pub use postgres::PgJobRepository;

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// The pending job with the smallest `created_at`, if any.
    async fn find_oldest_pending(&self) -> PipelineResult<Option<VideoJob>>;

    /// Apply the set fields of `update` to job `id`.
    async fn update(&self, id: Uuid, update: JobUpdate) -> PipelineResult<()>;

    async fn get(&self, id: Uuid) -> PipelineResult<Option<VideoJob>>;
}
