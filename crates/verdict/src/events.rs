//! Best-effort progress notifications for in-process listeners.
//!
//! The job store stays the source of truth; a lagging or absent receiver
//! never affects job execution.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::analysis::{ContentKind, JobStatus, Summary, TaskResult};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    #[serde(rename_all = "camelCase")]
    JobCreated {
        job_id: String,
        content_kind: ContentKind,
    },
    #[serde(rename_all = "camelCase")]
    JobStarted { job_id: String, total_models: usize },
    /// Sent after the result has been appended to the store.
    #[serde(rename_all = "camelCase")]
    TaskCompleted {
        job_id: String,
        result: TaskResult,
        completed: usize,
        total: usize,
    },
    #[serde(rename_all = "camelCase")]
    TaskFailed {
        job_id: String,
        model_name: String,
        error: String,
        /// True when a degraded result was recorded in its place.
        degraded: bool,
    },
    #[serde(rename_all = "camelCase")]
    JobFinished {
        job_id: String,
        status: JobStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<Summary>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl AnalysisEvent {
    pub fn job_id(&self) -> &str {
        match self {
            AnalysisEvent::JobCreated { job_id, .. }
            | AnalysisEvent::JobStarted { job_id, .. }
            | AnalysisEvent::TaskCompleted { job_id, .. }
            | AnalysisEvent::TaskFailed { job_id, .. }
            | AnalysisEvent::JobFinished { job_id, .. } => job_id,
        }
    }
}

/// Fans analysis events out to every subscriber.
#[derive(Clone)]
pub struct AnalysisEventBroadcaster {
    sender: Arc<broadcast::Sender<AnalysisEvent>>,
}

impl AnalysisEventBroadcaster {
    /// Creates a broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: AnalysisEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.sender.subscribe()
    }
}

impl Default for AnalysisEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
