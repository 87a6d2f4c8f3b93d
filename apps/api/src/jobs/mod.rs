// Asynchronous resume-analysis jobs.
// Submission creates a record and enqueues it; one worker drains the queue in
// order; clients poll the status projection.

pub mod handlers;
pub mod models;
pub mod pg_store;
pub mod processor;
pub mod queue;
pub mod status;
pub mod store;
pub mod submission;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

use crate::jobs::models::JobStatus;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(String),

    #[error("Job {job_id} is already {status} and can no longer change")]
    Terminal { job_id: String, status: JobStatus },

    #[error("Invalid update for job {job_id}: {reason}")]
    InvalidUpdate { job_id: String, reason: String },

    #[error("Corrupt job record {job_id}: {reason}")]
    Corrupt { job_id: String, reason: String },

    #[error("Job store error: {0}")]
    Storage(#[from] sqlx::Error),
}
