//! Durable record of jobs and their task results.
//!
//! The orchestrator is the only writer. Adapters validate status transitions
//! against the stored status atomically, so a racing writer sees
//! [`StoreError::InvalidTransition`] instead of overwriting a newer status.

pub mod error;
pub mod memory;
pub mod sqlite;

use crate::analysis::{AnalysisJob, JobSnapshot, JobStatus, StatusChange, TaskResult};

pub use error::StoreError;
pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;

pub trait JobStore: Send + Sync {
    /// Persists a new job. Fails with `AlreadyExists` on id reuse.
    fn create_job(&self, job: &AnalysisJob) -> Result<(), StoreError>;

    /// Moves a job to `change.status` and returns the updated job.
    fn update_status(&self, job_id: &str, change: &StatusChange)
        -> Result<AnalysisJob, StoreError>;

    /// Appends a result. The job must be `processing` and hold no result
    /// from the same model.
    fn append_result(&self, result: &TaskResult) -> Result<(), StoreError>;

    /// Returns the job and its results in append order.
    fn get_job(&self, job_id: &str) -> Result<Option<JobSnapshot>, StoreError>;

    /// Removes a job and its results. Returns false for unknown ids.
    fn delete_job(&self, job_id: &str) -> Result<bool, StoreError>;

    /// Jobs with the given status, oldest first.
    fn list_by_status(&self, status: JobStatus) -> Result<Vec<AnalysisJob>, StoreError>;

    fn count_jobs(&self) -> Result<u64, StoreError>;
}

/// Shared transition check used by every adapter.
pub(crate) fn check_transition(
    job_id: &str,
    from: JobStatus,
    to: JobStatus,
) -> Result<(), StoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition {
            job_id: job_id.to_string(),
            from,
            to,
        })
    }
}
