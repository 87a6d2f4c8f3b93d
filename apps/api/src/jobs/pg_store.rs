use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::warn;

use crate::analysis::models::AnalysisParameters;
use crate::jobs::models::{FileMetadata, Job, JobStatus, JobUpdate};
use crate::jobs::store::JobStore;
use crate::jobs::JobError;
use crate::models::job::AnalysisJobRow;

/// Postgres-backed job ledger. Every write is a single statement keyed by
/// `job_id`, so the state machine holds even with several writers.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn status_names(statuses: &[JobStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

/// Converts a batch of rows, dropping (and logging) rows that do not decode
/// so one bad record cannot block maintenance of the rest.
fn decodable_jobs(rows: Vec<AnalysisJobRow>) -> Vec<Job> {
    rows.into_iter()
        .filter_map(|row| match Job::try_from(row) {
            Ok(job) => Some(job),
            Err(e) => {
                warn!("Skipping unreadable job record: {e}");
                None
            }
        })
        .collect()
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(
        &self,
        file: FileMetadata,
        parameters: AnalysisParameters,
    ) -> Result<Job, JobError> {
        let job = Job::new(file, parameters, Utc::now());

        let row: AnalysisJobRow = sqlx::query_as(
            r#"
            INSERT INTO analysis_jobs
                (job_id, status, progress, file_name, file_size, mime_type,
                 input_parameters, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(&job.job_id)
        .bind(job.status.as_str())
        .bind(i32::from(job.progress))
        .bind(&job.file.name)
        .bind(i64::try_from(job.file.size).unwrap_or(i64::MAX))
        .bind(&job.file.mime_type)
        .bind(Json(&job.parameters))
        .bind(job.created_at)
        .fetch_one(&self.pool)
        .await?;

        Job::try_from(row)
    }

    async fn get(&self, job_id: &str) -> Result<Job, JobError> {
        let row: Option<AnalysisJobRow> =
            sqlx::query_as("SELECT * FROM analysis_jobs WHERE job_id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?;

        row.ok_or_else(|| JobError::NotFound(job_id.to_string()))
            .and_then(Job::try_from)
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<Job, JobError> {
        let now = Utc::now();
        let allowed = status_names(update.allowed_from());

        // Conditional write: the WHERE clause carries the transition rules, so a
        // lost race leaves the row untouched instead of moving it backwards.
        let row: Option<AnalysisJobRow> = sqlx::query_as(
            r#"
            UPDATE analysis_jobs
            SET status       = COALESCE($2, status),
                progress     = GREATEST(progress, COALESCE($3, progress)),
                result       = COALESCE($4, result),
                error        = COALESCE($5, error),
                completed_at = CASE WHEN $2 IN ('completed', 'failed') THEN $6 ELSE completed_at END,
                updated_at   = $6
            WHERE job_id = $1 AND status = ANY($7)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.progress.map(i32::from))
        .bind(update.result.as_ref().map(Json))
        .bind(update.error.as_deref())
        .bind(now)
        .bind(allowed)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Job::try_from(row),
            None => {
                // Explain the rejection from the current record.
                let current = self.get(job_id).await?;
                current.check_update(&update)?;
                Err(JobError::InvalidUpdate {
                    job_id: job_id.to_string(),
                    reason: format!("concurrent write while job was {}", current.status),
                })
            }
        }
    }

    async fn purge_expired(&self, created_before: DateTime<Utc>) -> Result<u64, JobError> {
        let result = sqlx::query("DELETE FROM analysis_jobs WHERE created_at < $1")
            .bind(created_before)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_unfinished(
        &self,
        statuses: &[JobStatus],
        updated_before: DateTime<Utc>,
    ) -> Result<Vec<Job>, JobError> {
        let rows: Vec<AnalysisJobRow> = sqlx::query_as(
            r#"
            SELECT * FROM analysis_jobs
            WHERE status = ANY($1) AND updated_at < $2
            ORDER BY created_at
            "#,
        )
        .bind(status_names(statuses))
        .bind(updated_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(decodable_jobs(rows))
    }
}
