//! Background expiry of jobs that never reach a terminal status.
//!
//! There is no way to cancel an in-flight job, so the supervisor fails it in
//! the store instead. The orchestrator notices on its next write and stops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::analysis::{AnalysisJob, JobStatus, StatusChange};
use crate::events::{AnalysisEvent, AnalysisEventBroadcaster};
use crate::store::{JobStore, StoreError};

pub struct JobSupervisor {
    store: Arc<dyn JobStore>,
    events: AnalysisEventBroadcaster,
    stuck_after: Duration,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl JobSupervisor {
    pub fn new(
        store: Arc<dyn JobStore>,
        events: AnalysisEventBroadcaster,
        stuck_after: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            events,
            stuck_after,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Fails every non-terminal job created more than `stuck_after` before
    /// `now`. Returns the ids of the jobs it failed.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let reason = format!("Timed out after {}s", self.stuck_after.as_secs());

        let mut expired = Vec::new();
        for job in self.active_jobs()? {
            // Negative ages (clock skew) fail `to_std` and count as fresh.
            let overdue = now
                .signed_duration_since(job.created_at)
                .to_std()
                .map(|age| age > self.stuck_after)
                .unwrap_or(false);
            if overdue && self.fail(&job, &reason)? {
                expired.push(job.id);
            }
        }

        if !expired.is_empty() {
            log::warn!("Expired {} stuck job(s)", expired.len());
        }
        Ok(expired)
    }

    /// Fails every job a previous process left pending or processing.
    ///
    /// Only safe before any job has been started by this process.
    pub fn fail_interrupted(&self) -> Result<usize, StoreError> {
        let mut failed = 0;
        for job in self.active_jobs()? {
            if self.fail(&job, "Interrupted by restart")? {
                failed += 1;
            }
        }
        if failed > 0 {
            log::warn!("Marked {} interrupted job(s) as failed", failed);
        }
        Ok(failed)
    }

    /// Runs `sweep` every `interval` until [`stop`](Self::stop) is called.
    pub fn start(&self) -> JoinHandle<()> {
        let supervisor = Self {
            store: Arc::clone(&self.store),
            events: self.events.clone(),
            stuck_after: self.stuck_after,
            interval: self.interval,
            shutdown: Arc::clone(&self.shutdown),
            wake: Arc::clone(&self.wake),
        };

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(supervisor.interval);
            timer.tick().await; // skip immediate first tick

            loop {
                if supervisor.shutdown.load(Ordering::Acquire) {
                    break;
                }

                tokio::select! {
                    _ = timer.tick() => {},
                    _ = supervisor.wake.notified() => {},
                }

                if supervisor.shutdown.load(Ordering::Acquire) {
                    break;
                }

                if let Err(e) = supervisor.sweep(Utc::now()) {
                    log::error!("Job supervisor sweep failed: {}", e);
                }
            }
            log::debug!("Job supervisor stopped");
        })
    }

    /// Signals the background loop to stop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    fn active_jobs(&self) -> Result<Vec<AnalysisJob>, StoreError> {
        let mut jobs = self.store.list_by_status(JobStatus::Pending)?;
        jobs.extend(self.store.list_by_status(JobStatus::Processing)?);
        Ok(jobs)
    }

    /// Returns false when the job finished on its own in the meantime.
    fn fail(&self, job: &AnalysisJob, reason: &str) -> Result<bool, StoreError> {
        match self.store.update_status(&job.id, &StatusChange::failed(reason)) {
            Ok(updated) => {
                log::warn!("Job {} failed by supervisor: {}", job.id, reason);
                self.events.send(AnalysisEvent::JobFinished {
                    job_id: updated.id,
                    status: updated.status,
                    summary: None,
                    error: updated.error,
                });
                Ok(true)
            }
            Err(StoreError::InvalidTransition { .. }) | Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
