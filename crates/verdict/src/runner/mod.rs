//! Execution of one detection unit against one content item.

pub mod error;
pub mod simulated;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info_span, Instrument};

use crate::analysis::{ContentItem, ContentKind, Detection, TaskResult};
use crate::registry::ModelDescriptor;

pub use error::TaskError;
pub use simulated::SimulatedDetector;

/// A pluggable detection unit.
///
/// Implementations may be deterministic or probabilistic. They must not touch
/// job state; persistence is the orchestrator's job.
#[async_trait]
pub trait DetectionUnit: Send + Sync {
    async fn detect(
        &self,
        model: &ModelDescriptor,
        content: &ContentItem,
    ) -> Result<Detection, TaskError>;
}

/// Adapts a plain function into a [`DetectionUnit`].
pub struct FnDetector<F> {
    func: F,
}

impl<F> FnDetector<F>
where
    F: Fn(&ModelDescriptor, &str, ContentKind) -> Result<Detection, TaskError> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> DetectionUnit for FnDetector<F>
where
    F: Fn(&ModelDescriptor, &str, ContentKind) -> Result<Detection, TaskError> + Send + Sync,
{
    async fn detect(
        &self,
        model: &ModelDescriptor,
        content: &ContentItem,
    ) -> Result<Detection, TaskError> {
        (self.func)(model, &content.content_ref, content.kind)
    }
}

/// Runs detection units and turns their output into task results.
#[derive(Clone)]
pub struct TaskRunner {
    unit: Arc<dyn DetectionUnit>,
    timeout: Option<Duration>,
}

impl TaskRunner {
    pub fn new(unit: Arc<dyn DetectionUnit>) -> Self {
        Self {
            unit,
            timeout: None,
        }
    }

    /// Bounds every invocation; an elapsed timeout is a task failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Invokes the unit for `model` and validates its output.
    pub async fn run_task(
        &self,
        job_id: &str,
        model: &ModelDescriptor,
        content: &ContentItem,
    ) -> Result<TaskResult, TaskError> {
        let span = info_span!("model_task",
            job_id = %job_id,
            model = %model.name,
            version = %model.version,
        );

        async move {
            let detection = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, self.unit.detect(model, content))
                    .await
                    .map_err(|_| TaskError::TimedOut {
                        model: model.name.clone(),
                        after: limit,
                    })??,
                None => self.unit.detect(model, content).await?,
            };

            validate_detection(model, &detection)?;

            debug!(
                flagged = detection.is_flagged,
                confidence = detection.confidence,
                detection_type = %detection.detection_type,
                "Model task finished"
            );

            Ok(TaskResult::from_detection(job_id, model, detection))
        }
        .instrument(span)
        .await
    }
}

fn validate_detection(model: &ModelDescriptor, detection: &Detection) -> Result<(), TaskError> {
    if !detection.confidence.is_finite() || !(0.0..=100.0).contains(&detection.confidence) {
        return Err(TaskError::InvalidOutput {
            model: model.name.clone(),
            reason: format!("confidence {} outside [0, 100]", detection.confidence),
        });
    }
    Ok(())
}
