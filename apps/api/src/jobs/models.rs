use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::models::{AnalysisParameters, AnalysisResult};
use crate::jobs::JobError;

/// Progress reported as soon as the worker picks a job up.
pub const STARTED_PROGRESS: u8 = 10;
pub const COMPLETED_PROGRESS: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// What the client uploaded. Captured once at submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

/// One resume-analysis request and its lifecycle record.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub file: FileMetadata,
    pub parameters: AnalysisParameters,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(file: FileMetadata, parameters: AnalysisParameters, now: DateTime<Utc>) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            status: JobStatus::Queued,
            progress: 0,
            file,
            parameters,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Rejects updates that would move the job backwards or touch a terminal record.
    pub fn check_update(&self, update: &JobUpdate) -> Result<(), JobError> {
        if self.status.is_terminal() {
            return Err(JobError::Terminal {
                job_id: self.job_id.clone(),
                status: self.status,
            });
        }

        if !update.allowed_from().contains(&self.status) {
            let reason = match update.status {
                Some(next) => format!("cannot move from {} to {}", self.status, next),
                None => format!("progress can only change while processing, job is {}", self.status),
            };
            return Err(JobError::InvalidUpdate {
                job_id: self.job_id.clone(),
                reason,
            });
        }

        Ok(())
    }

    /// Applies `update` in place. Used by the memory store; the Postgres store
    /// expresses the same rules in its conditional UPDATE.
    pub fn apply(&mut self, update: JobUpdate, now: DateTime<Utc>) -> Result<(), JobError> {
        self.check_update(&update)?;

        if let Some(status) = update.status {
            self.status = status;
            if status.is_terminal() {
                self.completed_at = Some(now);
            }
        }
        if let Some(progress) = update.progress {
            self.progress = self.progress.max(progress);
        }
        if update.result.is_some() {
            self.result = update.result;
        }
        if update.error.is_some() {
            self.error = update.error;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// A partial write to a job record.
///
/// Only built through the constructors below, each of which keeps the record
/// consistent: `progress == 100` only with `completed`, `result` only with
/// `completed`, `error` only with `failed`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub(super) status: Option<JobStatus>,
    pub(super) progress: Option<u8>,
    pub(super) result: Option<AnalysisResult>,
    pub(super) error: Option<String>,
}

impl JobUpdate {
    /// The worker picked the job up.
    pub fn started() -> Self {
        Self {
            status: Some(JobStatus::Processing),
            progress: Some(STARTED_PROGRESS),
            result: None,
            error: None,
        }
    }

    /// Intermediate milestone while processing. Capped below 100.
    pub fn progress(progress: u8) -> Self {
        Self {
            status: None,
            progress: Some(progress.min(COMPLETED_PROGRESS - 1)),
            result: None,
            error: None,
        }
    }

    pub fn completed(result: AnalysisResult) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(COMPLETED_PROGRESS),
            result: Some(result),
            error: None,
        }
    }

    /// Progress is left where it was.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            progress: None,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Statuses a job may be in for this update to apply.
    pub fn allowed_from(&self) -> &'static [JobStatus] {
        match self.status {
            Some(JobStatus::Processing) => &[JobStatus::Queued],
            Some(JobStatus::Completed) | Some(JobStatus::Failed) | None => {
                &[JobStatus::Processing]
            }
            Some(JobStatus::Queued) => &[],
        }
    }
}
