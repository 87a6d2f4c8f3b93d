//! Status Projection — the client-facing view of a job record.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::models::AnalysisResult;
use crate::jobs::models::{Job, JobStatus};
use crate::jobs::store::JobStore;
use crate::jobs::JobError;

/// Polling payload. Times are whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub elapsed_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Builds the view at `now`. `time_budget_secs` is the expected total run time;
/// the remaining estimate is that minus elapsed, floored at zero.
pub fn project(job: &Job, now: DateTime<Utc>, time_budget_secs: i64) -> JobStatusView {
    let elapsed_time = (now - job.created_at).num_seconds().max(0);

    let estimated_time_remaining = match job.status {
        JobStatus::Queued | JobStatus::Processing => {
            Some((time_budget_secs - elapsed_time).max(0))
        }
        JobStatus::Completed | JobStatus::Failed => None,
    };

    let result = match job.status {
        JobStatus::Completed => job.result.clone(),
        _ => None,
    };
    let error = match job.status {
        JobStatus::Failed => job.error.clone(),
        _ => None,
    };

    JobStatusView {
        job_id: job.job_id.clone(),
        status: job.status,
        progress: job.progress,
        elapsed_time,
        estimated_time_remaining,
        result,
        error,
    }
}

pub async fn get_status(
    store: &dyn JobStore,
    job_id: &str,
    time_budget_secs: i64,
) -> Result<JobStatusView, JobError> {
    let job = store.get(job_id).await?;
    Ok(project(&job, Utc::now(), time_budget_secs))
}
