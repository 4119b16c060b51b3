use super::JobRepository;
use crate::error::PipelineResult;
use crate::models::{AiResult, JobStatus, JobUpdate, RenditionInfo, VideoJob};
use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const JOB_COLUMNS: &str = "id, status, source_key, title, description, master_url, thumbnail_url, \
     duration_seconds, width, height, renditions, ai_result, error_message, created_at, updated_at";

#[derive(Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_job(row: &PgRow) -> DatabaseResult<VideoJob> {
        let status: String = row.try_get("status").map_err(DatabaseError::Query)?;
        let status = status
            .parse::<JobStatus>()
            .map_err(DatabaseError::Decode)?;

        let renditions: Option<serde_json::Value> =
            row.try_get("renditions").map_err(DatabaseError::Query)?;
        let renditions = renditions
            .map(serde_json::from_value::<Vec<RenditionInfo>>)
            .transpose()
            .map_err(|e| DatabaseError::Decode(format!("renditions: {}", e)))?;

        let ai_result: Option<serde_json::Value> =
            row.try_get("ai_result").map_err(DatabaseError::Query)?;
        let ai_result = ai_result
            .map(serde_json::from_value::<AiResult>)
            .transpose()
            .map_err(|e| DatabaseError::Decode(format!("ai_result: {}", e)))?;

        Ok(VideoJob {
            id: row.try_get("id").map_err(DatabaseError::Query)?,
            status,
            source_key: row.try_get("source_key").map_err(DatabaseError::Query)?,
            title: row.try_get("title").map_err(DatabaseError::Query)?,
            description: row.try_get("description").map_err(DatabaseError::Query)?,
            master_url: row.try_get("master_url").map_err(DatabaseError::Query)?,
            thumbnail_url: row.try_get("thumbnail_url").map_err(DatabaseError::Query)?,
            duration_seconds: row
                .try_get("duration_seconds")
                .map_err(DatabaseError::Query)?,
            width: row.try_get("width").map_err(DatabaseError::Query)?,
            height: row.try_get("height").map_err(DatabaseError::Query)?,
            renditions,
            ai_result,
            error_message: row.try_get("error_message").map_err(DatabaseError::Query)?,
            created_at: row.try_get("created_at").map_err(DatabaseError::Query)?,
            updated_at: row.try_get("updated_at").map_err(DatabaseError::Query)?,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &Option<T>, field: &str) -> DatabaseResult<Option<serde_json::Value>> {
    value
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| DatabaseError::Decode(format!("{}: {}", field, e)))
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn find_oldest_pending(&self) -> PipelineResult<Option<VideoJob>> {
        let query = format!(
            "SELECT {} FROM video_jobs WHERE status = 'pending' ORDER BY created_at ASC LIMIT 1",
            JOB_COLUMNS
        );

        let row = sqlx::query(&query)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(row.as_ref().map(Self::row_to_job).transpose()?)
    }

    async fn update(&self, id: Uuid, update: JobUpdate) -> PipelineResult<()> {
        let renditions = to_json(&update.renditions, "renditions")?;
        let ai_result = to_json(&update.ai_result, "ai_result")?;

        sqlx::query(
            "UPDATE video_jobs SET
             status = COALESCE($2, status),
             master_url = COALESCE($3, master_url),
             thumbnail_url = COALESCE($4, thumbnail_url),
             duration_seconds = COALESCE($5, duration_seconds),
             width = COALESCE($6, width),
             height = COALESCE($7, height),
             renditions = COALESCE($8, renditions),
             ai_result = COALESCE($9, ai_result),
             error_message = COALESCE($10, error_message),
             updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.status.map(|status| status.as_str()))
        .bind(&update.master_url)
        .bind(&update.thumbnail_url)
        .bind(update.duration_seconds)
        .bind(update.width)
        .bind(update.height)
        .bind(renditions)
        .bind(ai_result)
        .bind(&update.error_message)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> PipelineResult<Option<VideoJob>> {
        let query = format!("SELECT {} FROM video_jobs WHERE id = $1", JOB_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(row.as_ref().map(Self::row_to_job).transpose()?)
    }
}
