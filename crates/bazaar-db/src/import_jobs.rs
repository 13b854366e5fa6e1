//! Database operations for `import_jobs`.

use bazaar_core::{ImportJob, JobStatus};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const IMPORT_JOB_COLUMNS: &str = "id, public_id, total, processed, succeeded, failed, status, \
     started_at, completed_at, error_message, created_at";

/// A row from the `import_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportJobRow {
    pub id: i64,
    pub public_id: Uuid,
    pub total: i32,
    pub processed: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ImportJobRow> for ImportJob {
    type Error = DbError;

    fn try_from(row: ImportJobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            public_id: row.public_id,
            total: row.total,
            processed: row.processed,
            succeeded: row.succeeded,
            failed: row.failed,
            status: row.status.parse::<JobStatus>()?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}

/// Creates a job in `processing` status with `started_at = NOW()`.
///
/// Generates the UUID in Rust and binds it to `public_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_import_job(pool: &PgPool, total: i32) -> Result<ImportJob, DbError> {
    let row = sqlx::query_as::<_, ImportJobRow>(&format!(
        "INSERT INTO import_jobs (public_id, total, status, started_at) \
         VALUES ($1, $2, 'processing', NOW()) \
         RETURNING {IMPORT_JOB_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(total)
    .fetch_one(pool)
    .await?;

    ImportJob::try_from(row)
}

/// Writes the counters, status, `completed_at`, and `error_message` of `job`.
///
/// The table's CHECK constraints reject snapshots where
/// `processed != succeeded + failed` or `processed > total`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no job has `job.id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_import_job(pool: &PgPool, job: &ImportJob) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_jobs \
         SET processed = $1, succeeded = $2, failed = $3, status = $4, \
             completed_at = $5, error_message = $6 \
         WHERE id = $7",
    )
    .bind(job.processed)
    .bind(job.succeeded)
    .bind(job.failed)
    .bind(job.status.as_str())
    .bind(job.completed_at)
    .bind(job.error_message.as_deref())
    .bind(job.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            entity: "import job",
            key: job.id.to_string(),
        });
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_import_job(pool: &PgPool, id: i64) -> Result<Option<ImportJob>, DbError> {
    let row = sqlx::query_as::<_, ImportJobRow>(&format!(
        "SELECT {IMPORT_JOB_COLUMNS} FROM import_jobs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(ImportJob::try_from).transpose()
}

/// Lists the most recent jobs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_import_jobs(pool: &PgPool, limit: i64) -> Result<Vec<ImportJob>, DbError> {
    let rows = sqlx::query_as::<_, ImportJobRow>(&format!(
        "SELECT {IMPORT_JOB_COLUMNS} FROM import_jobs \
         ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ImportJob::try_from).collect()
}
