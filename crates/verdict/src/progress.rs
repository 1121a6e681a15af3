//! Read-only snapshot access for pollers.

use std::sync::Arc;

use crate::analysis::JobSnapshot;
use crate::error::{Result, VerdictError};
use crate::store::JobStore;

/// Side-effect free view over the job store.
///
/// Reads are idempotent; once a job is terminal, every snapshot is identical.
#[derive(Clone)]
pub struct ProgressReader {
    store: Arc<dyn JobStore>,
}

impl ProgressReader {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Returns the job and the results appended so far.
    pub fn get_snapshot(&self, job_id: &str) -> Result<JobSnapshot> {
        self.store
            .get_job(job_id)?
            .ok_or_else(|| VerdictError::NotFound(job_id.to_string()))
    }
}
