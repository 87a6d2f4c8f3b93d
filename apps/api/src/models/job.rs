use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::analysis::models::{AnalysisParameters, AnalysisResult};
use crate::jobs::models::{FileMetadata, Job, JobStatus};
use crate::jobs::JobError;

/// One row of `analysis_jobs`.
#[derive(Debug, Clone, FromRow)]
pub struct AnalysisJobRow {
    pub job_id: String,
    pub status: String,
    pub progress: i32,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub input_parameters: Json<AnalysisParameters>,
    pub result: Option<Json<AnalysisResult>>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<AnalysisJobRow> for Job {
    type Error = JobError;

    fn try_from(row: AnalysisJobRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| JobError::Corrupt {
            job_id: row.job_id.clone(),
            reason,
        };

        let status: JobStatus = row.status.parse().map_err(corrupt)?;
        let progress = u8::try_from(row.progress)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| corrupt(format!("progress {} out of range", row.progress)))?;
        let size = u64::try_from(row.file_size)
            .map_err(|_| corrupt(format!("negative file size {}", row.file_size)))?;

        Ok(Job {
            job_id: row.job_id,
            status,
            progress,
            file: FileMetadata {
                name: row.file_name,
                size,
                mime_type: row.mime_type,
            },
            parameters: row.input_parameters.0,
            result: row.result.map(|r| r.0),
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}
