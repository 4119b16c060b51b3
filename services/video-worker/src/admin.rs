//! Admin HTTP surface: liveness, manual drain trigger and job lookup

use crate::orchestrator::{DrainOutcome, Orchestrator};
use crate::repository::JobRepository;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Job not found")]
    NotFound,

    #[error("A drain is already running")]
    Busy,

    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match self {
            AdminError::NotFound => StatusCode::NOT_FOUND,
            AdminError::Busy => StatusCode::CONFLICT,
            AdminError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Clone)]
pub struct AdminState {
    pub orchestrator: Orchestrator,
    pub repository: Arc<dyn JobRepository>,
}

pub fn create_router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/jobs/drain", post(trigger_drain))
        .route("/jobs/:id", get(get_job))
        .with_state(state)
}

pub async fn health_check(State(state): State<AdminState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "video-worker",
        "busy": state.orchestrator.is_busy(),
    }))
}

/// Start a drain in the background, unless one is running already.
pub async fn trigger_drain(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, AdminError> {
    if state.orchestrator.is_busy() {
        return Err(AdminError::Busy);
    }

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        match orchestrator.run().await {
            Ok(DrainOutcome::AlreadyRunning) => {}
            Ok(DrainOutcome::Completed { succeeded, failed }) => {
                info!("Manual drain done: {} ready, {} failed", succeeded, failed)
            }
            Err(e) => error!("Manual drain stopped: {}", e),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "started" }))))
}

pub async fn get_job(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminError> {
    let job = state
        .repository
        .get(id)
        .await
        .map_err(|e| {
            error!("Failed to get job {}: {}", id, e);
            AdminError::InternalServerError
        })?
        .ok_or(AdminError::NotFound)?;

    Ok(Json(job))
}
