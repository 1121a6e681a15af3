//! Domain model for analysis jobs and their results.

pub mod job;
pub mod result;
pub mod summary;

use serde::{Deserialize, Serialize};

pub use job::{AnalysisJob, AnalysisRequest, ContentItem, ContentKind, JobStatus, StatusChange};
pub use result::{round_confidence, Detection, DetectionType, TaskResult};
pub use summary::{aggregate, Summary, Verdict};

/// Point-in-time view of a job and the results appended so far.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSnapshot {
    pub job: AnalysisJob,
    pub results: Vec<TaskResult>,
}
