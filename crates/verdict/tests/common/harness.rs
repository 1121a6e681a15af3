//! Test harness for isolated orchestrator runs.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use verdict::{
    AnalysisEvent, AnalysisRequest, ContentKind, Database, DetectionUnit, JobHandle, JobSnapshot,
    JobStore, MemoryJobStore, ModelRegistry, Orchestrator, OrchestratorSettings, ProgressReader,
    SqliteJobStore,
};

/// Orchestrator plus the store it writes to, torn down with the harness.
pub struct TestHarness {
    temp_dir: TempDir,
    pub store: Arc<dyn JobStore>,
    pub orchestrator: Orchestrator,
}

impl TestHarness {
    /// Harness backed by `MemoryJobStore`.
    pub fn in_memory(
        registry: ModelRegistry,
        unit: Arc<dyn DetectionUnit>,
        settings: OrchestratorSettings,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let orchestrator = Orchestrator::new(registry, store.clone(), unit, settings);
        Self {
            temp_dir,
            store,
            orchestrator,
        }
    }

    /// Harness backed by a SQLite file inside the harness temp directory.
    pub fn sqlite(
        registry: ModelRegistry,
        unit: Arc<dyn DetectionUnit>,
        settings: OrchestratorSettings,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("data").join("verdict.db"))
            .expect("Failed to open test database");
        let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(db));
        let orchestrator = Orchestrator::new(registry, store.clone(), unit, settings);
        Self {
            temp_dir,
            store,
            orchestrator,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("data").join("verdict.db")
    }

    pub fn reader(&self) -> ProgressReader {
        self.orchestrator.progress_reader()
    }

    pub async fn submit(&self, content_ref: &str, kind: ContentKind) -> JobHandle {
        self.orchestrator
            .start_analysis(&AnalysisRequest::new(content_ref, kind))
            .await
            .expect("Failed to start analysis")
    }

    /// Polls the progress reader the way a client would, until the job is
    /// terminal or `timeout` passes.
    pub async fn poll_until_terminal(&self, job_id: &str, timeout: Duration) -> JobSnapshot {
        let reader = self.reader();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let snapshot = reader.get_snapshot(job_id).expect("snapshot read failed");
            if snapshot.job.is_terminal() {
                return snapshot;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "job {} still {} after {:?}",
                job_id,
                snapshot.job.status,
                timeout
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Waits until `job_id` reports `count` completed tasks.
pub async fn wait_for_completed_tasks(
    events: &mut broadcast::Receiver<AnalysisEvent>,
    job_id: &str,
    count: usize,
) {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(AnalysisEvent::TaskCompleted {
                    job_id: id,
                    completed,
                    ..
                }) if id == job_id && completed == count => return,
                Ok(_) => continue,
                Err(e) => panic!("event stream closed: {}", e),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("timed out waiting for task completion");
}
