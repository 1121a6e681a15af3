//! Drives analysis jobs from submission to a terminal status.
//!
//! Each job runs in its own tokio task. Model tasks fan out with a
//! concurrency bound and every result is appended to the store as soon as
//! it arrives, so pollers observe partial progress.

pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info_span, Instrument};

use crate::analysis::{
    aggregate, AnalysisJob, AnalysisRequest, JobStatus, StatusChange, TaskResult,
};
use crate::error::{Result, VerdictError};
use crate::events::{AnalysisEvent, AnalysisEventBroadcaster};
use crate::progress::ProgressReader;
use crate::registry::ModelRegistry;
use crate::runner::{DetectionUnit, TaskRunner};
use crate::sanitize;
use crate::store::{JobStore, StoreError};

pub use retry::RetryPolicy;

/// What happens to a job when one of its model tasks fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the job and stop issuing model tasks.
    #[default]
    FailFast,
    /// Record an `uncertain` placeholder result and keep going.
    Degrade,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_concurrent_tasks: usize,
    pub failure_policy: FailurePolicy,
    pub task_timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: num_cpus::get(),
            failure_policy: FailurePolicy::default(),
            task_timeout: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Handle to a started job.
///
/// Dropping it does not cancel the job.
#[derive(Debug)]
pub struct JobHandle {
    job_id: String,
    task: JoinHandle<JobStatus>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Waits for execution to end and returns the job's final status.
    pub async fn wait(self) -> Result<JobStatus> {
        self.task.await.map_err(|e| VerdictError::Aborted {
            job_id: self.job_id,
            reason: e.to_string(),
        })
    }
}

struct Inner {
    registry: ModelRegistry,
    store: Arc<dyn JobStore>,
    runner: TaskRunner,
    settings: OrchestratorSettings,
    events: AnalysisEventBroadcaster,
}

/// Job state machine driver. Cloning is cheap.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        registry: ModelRegistry,
        store: Arc<dyn JobStore>,
        unit: Arc<dyn DetectionUnit>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self::with_events(
            registry,
            store,
            unit,
            settings,
            AnalysisEventBroadcaster::default(),
        )
    }

    pub fn with_events(
        registry: ModelRegistry,
        store: Arc<dyn JobStore>,
        unit: Arc<dyn DetectionUnit>,
        settings: OrchestratorSettings,
        events: AnalysisEventBroadcaster,
    ) -> Self {
        let mut runner = TaskRunner::new(unit);
        if let Some(timeout) = settings.task_timeout {
            runner = runner.with_timeout(timeout);
        }

        Self {
            inner: Arc::new(Inner {
                registry,
                store,
                runner,
                settings,
                events,
            }),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.inner.registry
    }

    pub fn store(&self) -> Arc<dyn JobStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn events(&self) -> &AnalysisEventBroadcaster {
        &self.inner.events
    }

    pub fn progress_reader(&self) -> ProgressReader {
        ProgressReader::new(self.store())
    }

    /// Validates the request, persists a pending job and starts executing it
    /// in the background.
    ///
    /// Must be called from within a tokio runtime. Nothing is stored when
    /// validation fails.
    pub async fn start_analysis(&self, request: &AnalysisRequest) -> Result<JobHandle> {
        let content = request.validate()?;
        let job = AnalysisJob::new(&content);

        let store = &self.inner.store;
        self.inner
            .settings
            .retry
            .run("create job", || store.create_job(&job))
            .await?;

        log::info!(
            "Created analysis job {} ({} content, {} models)",
            job.id,
            job.content_kind,
            self.inner.registry.len()
        );
        self.inner.events.send(AnalysisEvent::JobCreated {
            job_id: job.id.clone(),
            content_kind: job.content_kind,
        });

        let job_id = job.id.clone();
        let span = info_span!("analysis",
            job_id = %job.id,
            content = %sanitize::redact_content_ref(&job.content_ref),
            content_hash = %sanitize::hash_content_ref(&job.content_ref),
            kind = %job.content_kind,
        );
        let this = self.clone();
        let task = tokio::spawn(async move { this.execute(job).await }.instrument(span));

        Ok(JobHandle { job_id, task })
    }

    async fn execute(self, job: AnalysisJob) -> JobStatus {
        match self.drive(&job).await {
            Ok(status) => status,
            Err(e) => self.escalate(&job, e).await,
        }
    }

    async fn drive(&self, job: &AnalysisJob) -> std::result::Result<JobStatus, StoreError> {
        let inner = &self.inner;
        let retry = inner.settings.retry;

        retry
            .run("mark processing", || {
                inner.store.update_status(&job.id, &StatusChange::processing())
            })
            .await?;

        let total = inner.registry.len();
        inner.events.send(AnalysisEvent::JobStarted {
            job_id: job.id.clone(),
            total_models: total,
        });
        log::debug!("Job {} processing", job.id);

        let content = job.content();
        let invocations = inner.registry.models().iter().cloned().map(|model| {
            let runner = inner.runner.clone();
            let job_id = job.id.clone();
            let content = content.clone();
            async move {
                let outcome = runner.run_task(&job_id, &model, &content).await;
                (model, outcome)
            }
        });
        let mut tasks =
            stream::iter(invocations).buffer_unordered(inner.settings.max_concurrent_tasks.max(1));

        let mut results: Vec<TaskResult> = Vec::with_capacity(total);
        while let Some((model, outcome)) = tasks.next().await {
            let result = match outcome {
                Ok(result) => result,
                Err(err) => {
                    let degrade = inner.settings.failure_policy == FailurePolicy::Degrade;
                    inner.events.send(AnalysisEvent::TaskFailed {
                        job_id: job.id.clone(),
                        model_name: model.name.clone(),
                        error: err.to_string(),
                        degraded: degrade,
                    });

                    if !degrade {
                        log::warn!("Job {}: model '{}' failed, failing job: {}", job.id, model.name, err);
                        // In-flight invocations are abandoned with the stream.
                        drop(tasks);
                        return self.finish(job, StatusChange::failed(err.to_string())).await;
                    }

                    log::warn!(
                        "Job {}: model '{}' failed, recording degraded result: {}",
                        job.id,
                        model.name,
                        err
                    );
                    TaskResult::degraded(&job.id, &model, &err.to_string())
                }
            };

            retry
                .run("append result", || inner.store.append_result(&result))
                .await?;

            results.push(result.clone());
            inner.events.send(AnalysisEvent::TaskCompleted {
                job_id: job.id.clone(),
                result,
                completed: results.len(),
                total,
            });
        }

        let summary = aggregate(&results);
        self.finish(job, StatusChange::completed(summary)).await
    }

    async fn finish(
        &self,
        job: &AnalysisJob,
        change: StatusChange,
    ) -> std::result::Result<JobStatus, StoreError> {
        let inner = &self.inner;
        let updated = inner
            .settings
            .retry
            .run("finish job", || inner.store.update_status(&job.id, &change))
            .await?;

        match updated.status {
            JobStatus::Failed => log::warn!(
                "Job {} failed: {}",
                job.id,
                updated.error.as_deref().unwrap_or("unknown error")
            ),
            _ => {
                if let Some(summary) = &updated.summary {
                    log::info!(
                        "Job {} completed: {}/{} flagged, verdict {:?}",
                        job.id,
                        summary.flagged_count,
                        summary.total_models,
                        summary.overall_verdict
                    );
                }
            }
        }

        inner.events.send(AnalysisEvent::JobFinished {
            job_id: job.id.clone(),
            status: updated.status,
            summary: updated.summary,
            error: updated.error,
        });
        Ok(updated.status)
    }

    /// Resolves a store failure during execution to a final status.
    async fn escalate(&self, job: &AnalysisJob, err: StoreError) -> JobStatus {
        let store = &self.inner.store;

        if matches!(
            err,
            StoreError::InvalidTransition { .. }
                | StoreError::NotAcceptingResults { .. }
                | StoreError::NotFound(_)
        ) {
            // Someone else (usually the supervisor) already moved the job on.
            log::warn!("Stopping job {}: {}", job.id, err);
            return match store.get_job(&job.id) {
                Ok(Some(snapshot)) => snapshot.job.status,
                _ => JobStatus::Failed,
            };
        }

        log::error!("Persistence failed for job {}: {}", job.id, err);
        match self
            .finish(job, StatusChange::failed(format!("Persistence error: {}", err)))
            .await
        {
            Ok(status) => status,
            Err(e) => {
                log::error!("Could not mark job {} as failed: {}", job.id, e);
                JobStatus::Failed
            }
        }
    }
}
