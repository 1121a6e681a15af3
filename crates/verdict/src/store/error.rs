use thiserror::Error;

use crate::analysis::JobStatus;
use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {job_id} does not accept results while {status}")]
    NotAcceptingResults { job_id: String, status: JobStatus },

    #[error("Job {job_id} already has a result from model '{model}'")]
    DuplicateResult { job_id: String, model: String },
}

impl StoreError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(err) => err.is_retryable(),
            _ => false,
        }
    }
}
