//! Job repository: operations on the `analysis_jobs` table.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    pub id: String,
    pub content_ref: String,
    pub content_kind: String,
    pub status: String,
    /// Completion summary as JSON text.
    pub summary: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            content_ref: row.get("content_ref")?,
            content_kind: row.get("content_kind")?,
            status: row.get("status")?,
            summary: row.get("summary")?,
            failure_reason: row.get("failure_reason")?,
            created_at: row.get("created_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Column values written by a status transition.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub status: String,
    pub completed_at: Option<String>,
    pub summary: Option<String>,
    pub failure_reason: Option<String>,
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO analysis_jobs (id, content_ref, content_kind, status, summary,
             failure_reason, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                job.id,
                job.content_ref,
                job.content_kind,
                job.status,
                job.summary,
                job.failure_reason,
                job.created_at,
                job.completed_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM analysis_jobs WHERE id = ?1",
                params![id],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Applies `update` only while the stored status still equals `expected`.
///
/// Returns false when the row is missing or another writer moved it first.
pub fn transition(
    db: &Database,
    id: &str,
    expected: &str,
    update: &StatusUpdate,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE analysis_jobs
             SET status = ?3,
                 completed_at = ?4,
                 summary = COALESCE(?5, summary),
                 failure_reason = COALESCE(?6, failure_reason)
             WHERE id = ?1 AND status = ?2",
            params![
                id,
                expected,
                update.status,
                update.completed_at,
                update.summary,
                update.failure_reason,
            ],
        )?;
        Ok(changed == 1)
    })
}

/// Lists jobs with the given status, oldest first.
pub fn list_by_status(db: &Database, status: &str) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM analysis_jobs WHERE status = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map(params![status], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes a job. Its task results go with it (`ON DELETE CASCADE`).
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute("DELETE FROM analysis_jobs WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    })
}

/// Counts all jobs.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM analysis_jobs", [], |r| r.get(0))?;
        Ok(count)
    })
}
