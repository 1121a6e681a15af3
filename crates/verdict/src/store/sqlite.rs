//! SQLite-backed job store.

use chrono::{DateTime, SecondsFormat, Utc};

use super::{check_transition, JobStore, StoreError};
use crate::analysis::{
    AnalysisJob, ContentKind, DetectionType, JobSnapshot, JobStatus, StatusChange, TaskResult,
};
use crate::db::job_repo::{self, JobRow, StatusUpdate};
use crate::db::result_repo::{self, ResultRow};
use crate::db::{Database, DatabaseError};

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Fixed-width RFC 3339 so text order matches time order.
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(table: &'static str, s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::InvalidRow {
            table,
            reason: format!("bad timestamp '{}': {}", s, e),
        })
}

fn parse_status(s: &str) -> Result<JobStatus, DatabaseError> {
    JobStatus::parse(s).ok_or_else(|| DatabaseError::InvalidRow {
        table: "analysis_jobs",
        reason: format!("unknown status '{}'", s),
    })
}

fn job_to_row(job: &AnalysisJob) -> Result<JobRow, DatabaseError> {
    Ok(JobRow {
        id: job.id.clone(),
        content_ref: job.content_ref.clone(),
        content_kind: job.content_kind.as_str().to_string(),
        status: job.status.as_str().to_string(),
        summary: job
            .summary
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?,
        failure_reason: job.error.clone(),
        created_at: format_timestamp(job.created_at),
        completed_at: job.completed_at.map(format_timestamp),
    })
}

fn job_from_row(row: JobRow) -> Result<AnalysisJob, DatabaseError> {
    let content_kind =
        row.content_kind
            .parse::<ContentKind>()
            .map_err(|e| DatabaseError::InvalidRow {
                table: "analysis_jobs",
                reason: e.to_string(),
            })?;

    Ok(AnalysisJob {
        status: parse_status(&row.status)?,
        created_at: parse_timestamp("analysis_jobs", &row.created_at)?,
        completed_at: row
            .completed_at
            .as_deref()
            .map(|s| parse_timestamp("analysis_jobs", s))
            .transpose()?,
        summary: row
            .summary
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        error: row.failure_reason,
        content_kind,
        content_ref: row.content_ref,
        id: row.id,
    })
}

fn result_to_row(result: &TaskResult) -> Result<ResultRow, DatabaseError> {
    Ok(ResultRow {
        id: result.id.clone(),
        job_id: result.job_id.clone(),
        model_name: result.model_name.clone(),
        model_version: result.model_version.clone(),
        is_flagged: result.is_flagged,
        confidence: result.confidence,
        detection_type: result.detection_type.as_str().to_string(),
        metadata: serde_json::to_string(&result.metadata)?,
        created_at: format_timestamp(result.created_at),
    })
}

fn result_from_row(row: ResultRow) -> Result<TaskResult, DatabaseError> {
    let detection_type =
        DetectionType::parse(&row.detection_type).ok_or_else(|| DatabaseError::InvalidRow {
            table: "task_results",
            reason: format!("unknown detection type '{}'", row.detection_type),
        })?;

    Ok(TaskResult {
        created_at: parse_timestamp("task_results", &row.created_at)?,
        metadata: serde_json::from_str(&row.metadata)?,
        detection_type,
        id: row.id,
        job_id: row.job_id,
        model_name: row.model_name,
        model_version: row.model_version,
        is_flagged: row.is_flagged,
        confidence: row.confidence,
    })
}

// ─── SqliteJobStore ─────────────────────────────────────────────────────────

/// Durable store over the `analysis_jobs` and `task_results` tables.
///
/// Transitions use a compare-and-set on the stored status and result appends
/// are conditional inserts, so validation and write never straddle a
/// concurrent writer.
#[derive(Clone)]
pub struct SqliteJobStore {
    db: Database,
}

impl SqliteJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn current_status(&self, job_id: &str) -> Result<JobStatus, StoreError> {
        let row = job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        Ok(parse_status(&row.status)?)
    }
}

impl JobStore for SqliteJobStore {
    fn create_job(&self, job: &AnalysisJob) -> Result<(), StoreError> {
        let row = job_to_row(job)?;
        job_repo::insert(&self.db, &row).map_err(|e| {
            if e.is_constraint_violation() {
                StoreError::AlreadyExists(job.id.clone())
            } else {
                StoreError::Database(e)
            }
        })
    }

    fn update_status(
        &self,
        job_id: &str,
        change: &StatusChange,
    ) -> Result<AnalysisJob, StoreError> {
        let row = job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        let from = parse_status(&row.status)?;
        check_transition(job_id, from, change.status)?;

        let update = StatusUpdate {
            status: change.status.as_str().to_string(),
            completed_at: change.completed_at.map(format_timestamp),
            summary: change
                .summary
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(DatabaseError::from)?,
            failure_reason: change.error.clone(),
        };

        if !job_repo::transition(&self.db, job_id, from.as_str(), &update)? {
            // Another writer moved the job after our read.
            return Err(StoreError::InvalidTransition {
                job_id: job_id.to_string(),
                from: self.current_status(job_id)?,
                to: change.status,
            });
        }

        let mut job = job_from_row(row)?;
        job.apply(change);
        Ok(job)
    }

    fn append_result(&self, result: &TaskResult) -> Result<(), StoreError> {
        let row = result_to_row(result)?;
        match result_repo::insert_if_job_status(&self.db, &row, JobStatus::Processing.as_str()) {
            Ok(true) => Ok(()),
            Ok(false) => Err(StoreError::NotAcceptingResults {
                job_id: result.job_id.clone(),
                status: self.current_status(&result.job_id)?,
            }),
            Err(e) if e.is_constraint_violation() => Err(StoreError::DuplicateResult {
                job_id: result.job_id.clone(),
                model: result.model_name.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn get_job(&self, job_id: &str) -> Result<Option<JobSnapshot>, StoreError> {
        // Job first: any result visible to a completed read was appended
        // before the completion it depends on.
        let Some(row) = job_repo::find_by_id(&self.db, job_id)? else {
            return Ok(None);
        };
        let job = job_from_row(row)?;
        let results = result_repo::list_for_job(&self.db, job_id)?
            .into_iter()
            .map(result_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(JobSnapshot { job, results }))
    }

    fn delete_job(&self, job_id: &str) -> Result<bool, StoreError> {
        Ok(job_repo::delete(&self.db, job_id)?)
    }

    fn list_by_status(&self, status: JobStatus) -> Result<Vec<AnalysisJob>, StoreError> {
        let jobs = job_repo::list_by_status(&self.db, status.as_str())?
            .into_iter()
            .map(job_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn count_jobs(&self) -> Result<u64, StoreError> {
        Ok(job_repo::count(&self.db)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{aggregate, ContentItem, Detection};
    use crate::registry::ModelDescriptor;

    fn test_store() -> SqliteJobStore {
        SqliteJobStore::new(Database::open_in_memory().expect("Failed to create test database"))
    }

    fn new_job() -> AnalysisJob {
        AnalysisJob::new(&ContentItem::new("uploads/clip.mp4", ContentKind::Video))
    }

    fn result_for(job_id: &str, model: &str, flagged: bool) -> TaskResult {
        let detection = if flagged {
            Detection::new(true, 91.456, DetectionType::Deepfake)
                .with_metadata("artifacts", vec!["lip-sync drift"])
        } else {
            Detection::new(false, 62.0, DetectionType::Authentic)
        };
        TaskResult::from_detection(job_id, &ModelDescriptor::new(model, "2.0", "face"), detection)
    }

    #[test]
    fn test_job_round_trip() {
        let store = test_store();
        let job = new_job();
        store.create_job(&job).unwrap();

        let snapshot = store.get_job(&job.id).unwrap().unwrap();
        assert_eq!(snapshot.job, job);
        assert!(snapshot.results.is_empty());
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let store = test_store();
        let job = new_job();
        store.create_job(&job).unwrap();
        assert!(matches!(
            store.create_job(&job),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_results_round_trip_in_append_order() {
        let store = test_store();
        let job = new_job();
        store.create_job(&job).unwrap();
        store.update_status(&job.id, &StatusChange::processing()).unwrap();

        let first = result_for(&job.id, "VoiceGuard", true);
        let second = result_for(&job.id, "FaceForensics Detector", false);
        store.append_result(&first).unwrap();
        store.append_result(&second).unwrap();

        let snapshot = store.get_job(&job.id).unwrap().unwrap();
        assert_eq!(snapshot.job.status, JobStatus::Processing);
        assert_eq!(snapshot.results, vec![first, second]);
        assert_eq!(snapshot.results[0].confidence, 91.46);
        assert_eq!(snapshot.results[0].metadata["artifacts"][0], "lip-sync drift");
    }

    #[test]
    fn test_completion_persists_summary() {
        let store = test_store();
        let job = new_job();
        store.create_job(&job).unwrap();
        store.update_status(&job.id, &StatusChange::processing()).unwrap();
        store.append_result(&result_for(&job.id, "a", true)).unwrap();
        store.append_result(&result_for(&job.id, "b", false)).unwrap();

        let results = store.get_job(&job.id).unwrap().unwrap().results;
        let summary = aggregate(&results);
        let updated = store
            .update_status(&job.id, &StatusChange::completed(summary.clone()))
            .unwrap();

        let stored = store.get_job(&job.id).unwrap().unwrap().job;
        assert_eq!(stored, updated);
        assert_eq!(stored.summary, Some(summary));
        assert!(stored.completed_at.is_some());
    }

    #[test]
    fn test_failure_reason_persisted() {
        let store = test_store();
        let job = new_job();
        store.create_job(&job).unwrap();
        store.update_status(&job.id, &StatusChange::processing()).unwrap();
        store
            .update_status(&job.id, &StatusChange::failed("VoiceGuard unreachable"))
            .unwrap();

        let stored = store.get_job(&job.id).unwrap().unwrap().job;
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("VoiceGuard unreachable"));
        assert!(stored.summary.is_none());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let store = test_store();
        let job = new_job();
        store.create_job(&job).unwrap();

        let summary = aggregate(&[]);
        assert!(matches!(
            store.update_status(&job.id, &StatusChange::completed(summary)),
            Err(StoreError::InvalidTransition {
                from: JobStatus::Pending,
                to: JobStatus::Completed,
                ..
            })
        ));

        store.update_status(&job.id, &StatusChange::failed("expired")).unwrap();
        assert!(matches!(
            store.update_status(&job.id, &StatusChange::processing()),
            Err(StoreError::InvalidTransition { .. })
        ));
        assert!(matches!(
            store.update_status("missing", &StatusChange::processing()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_append_rules() {
        let store = test_store();
        let job = new_job();
        store.create_job(&job).unwrap();

        assert!(matches!(
            store.append_result(&result_for(&job.id, "a", true)),
            Err(StoreError::NotAcceptingResults {
                status: JobStatus::Pending,
                ..
            })
        ));

        store.update_status(&job.id, &StatusChange::processing()).unwrap();
        store.append_result(&result_for(&job.id, "a", true)).unwrap();
        assert!(matches!(
            store.append_result(&result_for(&job.id, "a", false)),
            Err(StoreError::DuplicateResult { .. })
        ));
        assert!(matches!(
            store.append_result(&result_for("missing", "a", true)),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_delete_count() {
        let store = test_store();
        let first = new_job();
        let second = new_job();
        store.create_job(&first).unwrap();
        store.create_job(&second).unwrap();
        store.update_status(&first.id, &StatusChange::processing()).unwrap();
        store.append_result(&result_for(&first.id, "a", true)).unwrap();

        let processing = store.list_by_status(JobStatus::Processing).unwrap();
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].id, first.id);
        assert_eq!(store.count_jobs().unwrap(), 2);

        assert!(store.delete_job(&first.id).unwrap());
        assert!(store.get_job(&first.id).unwrap().is_none());
        assert!(result_repo::list_for_job(store.database(), &first.id)
            .unwrap()
            .is_empty());
        assert_eq!(store.count_jobs().unwrap(), 1);
    }

    #[test]
    fn test_job_can_fail_after_panic_while_locked() {
        let store = test_store();
        let job = new_job();
        store.create_job(&job).unwrap();
        store.update_status(&job.id, &StatusChange::processing()).unwrap();

        let db = store.database().clone();
        let outcome = std::thread::spawn(move || {
            let _: Result<(), DatabaseError> = db.with_conn(|_| panic!("writer crashed"));
        })
        .join();
        assert!(outcome.is_err());

        store
            .update_status(&job.id, &StatusChange::failed("Persistence error: writer crashed"))
            .unwrap();
        let stored = store.get_job(&job.id).unwrap().unwrap().job;
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.completed_at.is_some());
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let early = DateTime::parse_from_rfc3339("2026-01-01T00:00:09Z")
            .unwrap()
            .with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2026-01-01T00:00:10.5Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(format_timestamp(early) < format_timestamp(late));
    }
}
