//! Analysis job model and its status state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::summary::Summary;
use crate::error::ValidationError;

/// Kind of content submitted for analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Video,
    Audio,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Image => "image",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(ContentKind::Image),
            "video" => Ok(ContentKind::Video),
            "audio" => Ok(ContentKind::Audio),
            "" => Err(ValidationError::MissingFields),
            _ => Err(ValidationError::InvalidContentKind(s.trim().to_string())),
        }
    }
}

/// Lifecycle status of an analysis job.
///
/// `Pending` is the only initial state, `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Forward-only transition table.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated content item handed to detection units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub content_ref: String,
    pub kind: ContentKind,
}

impl ContentItem {
    pub fn new(content_ref: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            content_ref: content_ref.into(),
            kind,
        }
    }
}

/// Raw job submission as received from the upload collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub content_ref: Option<String>,
    #[serde(default)]
    pub content_kind: Option<String>,
}

impl AnalysisRequest {
    pub fn new(content_ref: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            content_ref: Some(content_ref.into()),
            content_kind: Some(kind.as_str().to_string()),
        }
    }

    /// Checks that both fields are present and the kind is known.
    pub fn validate(&self) -> Result<ContentItem, ValidationError> {
        let content_ref = self
            .content_ref
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingFields)?;
        let kind = self
            .content_kind
            .as_deref()
            .ok_or(ValidationError::MissingFields)?
            .parse::<ContentKind>()?;

        Ok(ContentItem::new(content_ref, kind))
    }
}

/// A status change written to the job store.
///
/// Constructors guarantee that `completed_at` is present exactly when the
/// target status is terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: JobStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub summary: Option<Summary>,
    pub error: Option<String>,
}

impl StatusChange {
    pub fn processing() -> Self {
        Self {
            status: JobStatus::Processing,
            completed_at: None,
            summary: None,
            error: None,
        }
    }

    pub fn completed(summary: Summary) -> Self {
        Self {
            status: JobStatus::Completed,
            completed_at: Some(Utc::now()),
            summary: Some(summary),
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            completed_at: Some(Utc::now()),
            summary: None,
            error: Some(reason.into()),
        }
    }
}

/// One content item tracked through detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    pub id: String,
    pub content_ref: String,
    pub content_kind: ContentKind,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Set together with the transition into `Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    /// Failure reason, set together with the transition into `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisJob {
    /// Creates a new pending job for the given content.
    pub fn new(content: &ContentItem) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content_ref: content.content_ref.clone(),
            content_kind: content.kind,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            summary: None,
            error: None,
        }
    }

    pub fn content(&self) -> ContentItem {
        ContentItem::new(self.content_ref.clone(), self.content_kind)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies an already validated status change.
    pub fn apply(&mut self, change: &StatusChange) {
        self.status = change.status;
        self.completed_at = change.completed_at;
        if change.summary.is_some() {
            self.summary = change.summary.clone();
        }
        if change.error.is_some() {
            self.error = change.error.clone();
        }
    }
}
