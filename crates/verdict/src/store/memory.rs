//! In-process job store for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{check_transition, JobStore, StoreError};
use crate::analysis::{AnalysisJob, JobSnapshot, JobStatus, StatusChange, TaskResult};

/// `RwLock<HashMap>` backed store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, JobSnapshot>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobSnapshot>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobSnapshot>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl JobStore for MemoryJobStore {
    fn create_job(&self, job: &AnalysisJob) -> Result<(), StoreError> {
        let mut jobs = self.write();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id.clone()));
        }
        jobs.insert(
            job.id.clone(),
            JobSnapshot {
                job: job.clone(),
                results: Vec::new(),
            },
        );
        Ok(())
    }

    fn update_status(
        &self,
        job_id: &str,
        change: &StatusChange,
    ) -> Result<AnalysisJob, StoreError> {
        let mut jobs = self.write();
        let entry = jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;

        check_transition(job_id, entry.job.status, change.status)?;
        entry.job.apply(change);
        Ok(entry.job.clone())
    }

    fn append_result(&self, result: &TaskResult) -> Result<(), StoreError> {
        let mut jobs = self.write();
        let entry = jobs
            .get_mut(&result.job_id)
            .ok_or_else(|| StoreError::NotFound(result.job_id.clone()))?;

        if entry.job.status != JobStatus::Processing {
            return Err(StoreError::NotAcceptingResults {
                job_id: result.job_id.clone(),
                status: entry.job.status,
            });
        }
        if entry
            .results
            .iter()
            .any(|r| r.model_name == result.model_name)
        {
            return Err(StoreError::DuplicateResult {
                job_id: result.job_id.clone(),
                model: result.model_name.clone(),
            });
        }

        entry.results.push(result.clone());
        Ok(())
    }

    fn get_job(&self, job_id: &str) -> Result<Option<JobSnapshot>, StoreError> {
        Ok(self.read().get(job_id).cloned())
    }

    fn delete_job(&self, job_id: &str) -> Result<bool, StoreError> {
        Ok(self.write().remove(job_id).is_some())
    }

    fn list_by_status(&self, status: JobStatus) -> Result<Vec<AnalysisJob>, StoreError> {
        let mut jobs: Vec<AnalysisJob> = self
            .read()
            .values()
            .filter(|s| s.job.status == status)
            .map(|s| s.job.clone())
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }

    fn count_jobs(&self) -> Result<u64, StoreError> {
        Ok(self.read().len() as u64)
    }
}
