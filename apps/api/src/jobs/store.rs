//! Job Store — the ledger of job state.
//!
//! `JobStore` is carried in `AppState` as `Arc<dyn JobStore>`. Two backends:
//! `MemoryJobStore` (no database configured, tests) and
//! `pg_store::PgJobStore` (durable).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::analysis::models::AnalysisParameters;
use crate::jobs::models::{FileMetadata, Job, JobStatus, JobUpdate};
use crate::jobs::JobError;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a fresh `queued` record with progress 0.
    async fn create(
        &self,
        file: FileMetadata,
        parameters: AnalysisParameters,
    ) -> Result<Job, JobError>;

    /// Returns an owned copy of the record, or `JobError::NotFound`.
    async fn get(&self, job_id: &str) -> Result<Job, JobError>;

    /// Applies a partial update as one atomic write and returns the new record.
    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<Job, JobError>;

    /// Deletes every job created before `created_before`, whatever its status.
    async fn purge_expired(&self, created_before: DateTime<Utc>) -> Result<u64, JobError>;

    /// Jobs in one of `statuses` whose last write is older than `updated_before`,
    /// oldest first.
    async fn list_unfinished(
        &self,
        statuses: &[JobStatus],
        updated_before: DateTime<Utc>,
    ) -> Result<Vec<Job>, JobError>;
}

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(
        &self,
        file: FileMetadata,
        parameters: AnalysisParameters,
    ) -> Result<Job, JobError> {
        let job = Job::new(file, parameters, Utc::now());
        self.jobs
            .write()
            .await
            .insert(job.job_id.clone(), job.clone());
        Ok(job)
    }

    async fn get(&self, job_id: &str) -> Result<Job, JobError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        job.apply(update, Utc::now())?;
        Ok(job.clone())
    }

    async fn purge_expired(&self, created_before: DateTime<Utc>) -> Result<u64, JobError> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.created_at >= created_before);
        Ok((before - jobs.len()) as u64)
    }

    async fn list_unfinished(
        &self,
        statuses: &[JobStatus],
        updated_before: DateTime<Utc>,
    ) -> Result<Vec<Job>, JobError> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<Job> = jobs
            .values()
            .filter(|job| statuses.contains(&job.status) && job.updated_at < updated_before)
            .cloned()
            .collect();
        matching.sort_by_key(|job| job.created_at);
        Ok(matching)
    }
}
