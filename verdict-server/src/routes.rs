//! HTTP routes for submitting analyses and reading their progress.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use verdict::{AnalysisRequest, JobSnapshot, ModelDescriptor};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub jobs: u64,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/jobs/{job_id}", get(get_job))
        .route("/api/models", get(list_models))
        .route("/api/health", get(health))
        .with_state(Arc::new(state))
}

/// POST /api/analyze - Start an analysis job and return its id
async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(request) = payload?;
    let handle = state.orchestrator.start_analysis(&request).await?;

    // The job keeps running after the handle is dropped.
    Ok(Json(AnalyzeResponse {
        job_id: handle.job_id().to_string(),
    }))
}

/// GET /api/jobs/{job_id} - Snapshot of a job and its results so far
async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    Ok(Json(state.reader.get_snapshot(&job_id)?))
}

/// GET /api/models - Registered models in execution order
async fn list_models(State(state): State<Arc<AppState>>) -> Json<Vec<ModelDescriptor>> {
    Json(state.orchestrator.registry().models().to_vec())
}

/// GET /api/health
async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let jobs = state.orchestrator.store().count_jobs()?;
    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        jobs,
    }))
}
