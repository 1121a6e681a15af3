//! Aggregation of per-model results into an overall verdict.

use serde::{Deserialize, Serialize};

use super::result::{round_confidence, TaskResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Flagged,
    Authentic,
}

/// Completion summary attached to a completed job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_models: usize,
    pub flagged_count: usize,
    pub authentic_count: usize,
    pub average_confidence: f64,
    pub overall_verdict: Verdict,
}

/// Computes the summary for a set of results.
///
/// A strict majority of flagged results is required to flag the content;
/// exactly half resolves to `Authentic`. An empty set averages to zero.
pub fn aggregate(results: &[TaskResult]) -> Summary {
    let total_models = results.len();
    let flagged_count = results.iter().filter(|r| r.is_flagged).count();

    let average_confidence = if total_models == 0 {
        0.0
    } else {
        let sum: f64 = results.iter().map(|r| r.confidence.clamp(0.0, 100.0)).sum();
        round_confidence(sum / total_models as f64)
    };

    let overall_verdict = if flagged_count * 2 > total_models {
        Verdict::Flagged
    } else {
        Verdict::Authentic
    };

    Summary {
        total_models,
        flagged_count,
        authentic_count: total_models - flagged_count,
        average_confidence,
        overall_verdict,
    }
}
