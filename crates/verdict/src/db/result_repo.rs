//! Task result repository: operations on the `task_results` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw task result row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub id: String,
    pub job_id: String,
    pub model_name: String,
    pub model_version: String,
    pub is_flagged: bool,
    pub confidence: f64,
    pub detection_type: String,
    /// Metadata object as JSON text.
    pub metadata: String,
    pub created_at: String,
}

impl ResultRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            model_name: row.get("model_name")?,
            model_version: row.get("model_version")?,
            is_flagged: row.get("is_flagged")?,
            confidence: row.get("confidence")?,
            detection_type: row.get("detection_type")?,
            metadata: row.get("metadata")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a result only while its job is in `required_status`.
///
/// The status check and the insert are a single statement, so a concurrent
/// transition cannot slip in between. Returns false when nothing was written.
pub fn insert_if_job_status(
    db: &Database,
    result: &ResultRow,
    required_status: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let inserted = conn.execute(
            "INSERT INTO task_results (id, job_id, model_name, model_version, is_flagged,
             confidence, detection_type, metadata, created_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
             WHERE EXISTS (SELECT 1 FROM analysis_jobs WHERE id = ?2 AND status = ?10)",
            params![
                result.id,
                result.job_id,
                result.model_name,
                result.model_version,
                result.is_flagged,
                result.confidence,
                result.detection_type,
                result.metadata,
                result.created_at,
                required_status,
            ],
        )?;
        Ok(inserted == 1)
    })
}

/// Lists the results of a job in append order.
pub fn list_for_job(db: &Database, job_id: &str) -> Result<Vec<ResultRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM task_results WHERE job_id = ?1 ORDER BY rowid ASC")?;
        let rows = stmt
            .query_map(params![job_id], ResultRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
