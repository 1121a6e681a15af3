//! Per-model detection output.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::ModelDescriptor;

/// Classification reported by a detection unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DetectionType {
    Deepfake,
    Synthetic,
    Authentic,
    Uncertain,
}

impl DetectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionType::Deepfake => "deepfake",
            DetectionType::Synthetic => "synthetic",
            DetectionType::Authentic => "authentic",
            DetectionType::Uncertain => "uncertain",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deepfake" => Some(DetectionType::Deepfake),
            "synthetic" => Some(DetectionType::Synthetic),
            "authentic" => Some(DetectionType::Authentic),
            "uncertain" => Some(DetectionType::Uncertain),
            _ => None,
        }
    }
}

impl fmt::Display for DetectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rounds a confidence value to two decimals and clamps it into `[0, 100]`.
pub fn round_confidence(value: f64) -> f64 {
    ((value * 100.0).round() / 100.0).clamp(0.0, 100.0)
}

/// Raw verdict returned by a detection unit, before it is tied to a job.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub is_flagged: bool,
    pub confidence: f64,
    pub detection_type: DetectionType,
    pub metadata: Map<String, Value>,
}

impl Detection {
    pub fn new(is_flagged: bool, confidence: f64, detection_type: DetectionType) -> Self {
        Self {
            is_flagged,
            confidence,
            detection_type,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Output of one detection unit for one job. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub id: String,
    pub job_id: String,
    pub model_name: String,
    pub model_version: String,
    pub is_flagged: bool,
    pub confidence: f64,
    pub detection_type: DetectionType,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl TaskResult {
    /// Ties a detection to a job. Confidence is stored with two decimals.
    pub fn from_detection(job_id: &str, model: &ModelDescriptor, detection: Detection) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            model_name: model.name.clone(),
            model_version: model.version.clone(),
            is_flagged: detection.is_flagged,
            confidence: round_confidence(detection.confidence),
            detection_type: detection.detection_type,
            metadata: detection.metadata,
            created_at: Utc::now(),
        }
    }

    /// Placeholder result recorded when a model failed under the degrade policy.
    pub fn degraded(job_id: &str, model: &ModelDescriptor, error: &str) -> Self {
        let detection = Detection::new(false, 0.0, DetectionType::Uncertain)
            .with_metadata("degraded", true)
            .with_metadata("error", error);
        Self::from_detection(job_id, model, detection)
    }
}
