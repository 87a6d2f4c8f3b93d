//! Sweeper — retention and stuck-job handling.
//!
//! - Retention: jobs are purged a fixed time after creation, whatever their status.
//! - Staleness: a `processing` job with no write for `stale_after` is force-failed.
//! - Startup recovery: jobs left unfinished by a previous process can never
//!   run (their file bytes lived in that process's queue), so they are failed
//!   before the worker starts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::jobs::models::{JobStatus, JobUpdate};
use crate::jobs::store::JobStore;
use crate::jobs::JobError;

pub const INTERRUPTED_MESSAGE: &str = "Job was interrupted by a service restart";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub purged: u64,
    pub timed_out: usize,
}

pub struct Sweeper {
    store: Arc<dyn JobStore>,
    retention: chrono::Duration,
    stale_after: chrono::Duration,
    interval: Duration,
}

impl Sweeper {
    pub fn new(
        store: Arc<dyn JobStore>,
        retention: chrono::Duration,
        stale_after: chrono::Duration,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            retention,
            stale_after,
            interval,
        }
    }

    pub fn from_config(store: Arc<dyn JobStore>, config: &Config) -> Self {
        Self::new(
            store,
            chrono::Duration::hours(config.job_retention_hours as i64),
            chrono::Duration::seconds(config.job_stale_after_secs as i64),
            Duration::from_secs(config.sweep_interval_secs.max(1)),
        )
    }

    /// One pass at `now`. A failure in one step is logged and does not stop the other.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        match self.store.purge_expired(now - self.retention).await {
            Ok(purged) => report.purged = purged,
            Err(e) => error!("Retention purge failed: {e}"),
        }

        match self.fail_stale(now).await {
            Ok(timed_out) => report.timed_out = timed_out,
            Err(e) => error!("Stale job check failed: {e}"),
        }

        if report.purged > 0 || report.timed_out > 0 {
            info!(
                "Sweep removed {} expired job(s) and timed out {} stuck job(s)",
                report.purged, report.timed_out
            );
        }
        report
    }

    async fn fail_stale(&self, now: DateTime<Utc>) -> Result<usize, JobError> {
        let stale = self
            .store
            .list_unfinished(&[JobStatus::Processing], now - self.stale_after)
            .await?;

        let message = format!(
            "Job timed out: no progress for {} seconds",
            self.stale_after.num_seconds()
        );
        let mut failed = 0;
        for job in stale {
            match self
                .store
                .update(&job.job_id, JobUpdate::failed(message.clone()))
                .await
            {
                Ok(_) => {
                    warn!("Job {} timed out in processing", job.job_id);
                    failed += 1;
                }
                // Finished between the listing and the write.
                Err(JobError::Terminal { .. }) => {}
                Err(e) => error!("Could not time out job {}: {e}", job.job_id),
            }
        }
        Ok(failed)
    }

    /// Runs `sweep_once` on a fixed interval until the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep_once(Utc::now()).await;
            }
        })
    }
}

/// Fails every job a previous process left `queued` or `processing`.
/// Must run before the worker starts. Queued jobs pass through `processing`
/// so the state machine is never skipped. A job that cannot be failed is
/// logged and left for the sweeper; recovery never stops startup.
pub async fn recover_interrupted(store: &dyn JobStore, started_at: DateTime<Utc>) -> usize {
    let orphans = match store
        .list_unfinished(&[JobStatus::Queued, JobStatus::Processing], started_at)
        .await
    {
        Ok(orphans) => orphans,
        Err(e) => {
            error!("Could not list interrupted jobs: {e}");
            return 0;
        }
    };

    let mut recovered = 0;
    for job in orphans {
        match fail_orphan(store, &job.job_id, job.status).await {
            Ok(()) => recovered += 1,
            Err(e) => error!("Could not recover interrupted job {}: {e}", job.job_id),
        }
    }

    if recovered > 0 {
        warn!("Marked {recovered} interrupted job(s) as failed");
    }
    recovered
}

async fn fail_orphan(store: &dyn JobStore, job_id: &str, status: JobStatus) -> Result<(), JobError> {
    if status == JobStatus::Queued {
        store.update(job_id, JobUpdate::started()).await?;
    }
    store.update(job_id, JobUpdate::failed(INTERRUPTED_MESSAGE)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::AnalysisParameters;
    use crate::jobs::models::{FileMetadata, Job};
    use crate::jobs::store::MemoryJobStore;
    use crate::jobs::testing::{file_metadata, sample_parameters, sample_result, RecordingStore};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex;

    /// Memory store whose writes to one job always fail, and whose listing can
    /// be made to fail.
    #[derive(Default)]
    struct BrokenStore {
        inner: MemoryJobStore,
        broken_job: Mutex<Option<String>>,
        listing_fails: bool,
    }

    #[async_trait]
    impl JobStore for BrokenStore {
        async fn create(
            &self,
            file: FileMetadata,
            parameters: AnalysisParameters,
        ) -> Result<Job, JobError> {
            self.inner.create(file, parameters).await
        }

        async fn get(&self, job_id: &str) -> Result<Job, JobError> {
            self.inner.get(job_id).await
        }

        async fn update(&self, job_id: &str, update: JobUpdate) -> Result<Job, JobError> {
            if self.broken_job.lock().unwrap().as_deref() == Some(job_id) {
                return Err(JobError::Corrupt {
                    job_id: job_id.to_string(),
                    reason: "unreadable row".to_string(),
                });
            }
            self.inner.update(job_id, update).await
        }

        async fn purge_expired(&self, created_before: DateTime<Utc>) -> Result<u64, JobError> {
            self.inner.purge_expired(created_before).await
        }

        async fn list_unfinished(
            &self,
            statuses: &[JobStatus],
            updated_before: DateTime<Utc>,
        ) -> Result<Vec<Job>, JobError> {
            if self.listing_fails {
                return Err(JobError::Corrupt {
                    job_id: "unknown".to_string(),
                    reason: "unreadable row".to_string(),
                });
            }
            self.inner.list_unfinished(statuses, updated_before).await
        }
    }

    fn sweeper(store: Arc<RecordingStore>) -> Sweeper {
        Sweeper::new(
            store,
            ChronoDuration::hours(24),
            ChronoDuration::seconds(900),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn test_sweep_purges_expired_jobs_of_any_status() {
        let store = Arc::new(RecordingStore::default());
        let done = store
            .create(file_metadata(), sample_parameters())
            .await
            .unwrap();
        store.update(&done.job_id, JobUpdate::started()).await.unwrap();
        store
            .update(&done.job_id, JobUpdate::completed(sample_result()))
            .await
            .unwrap();
        let waiting = store
            .create(file_metadata(), sample_parameters())
            .await
            .unwrap();

        let report = sweeper(store.clone())
            .sweep_once(Utc::now() + ChronoDuration::hours(25))
            .await;

        assert_eq!(report.purged, 2);
        assert!(matches!(store.get(&done.job_id).await, Err(JobError::NotFound(_))));
        assert!(matches!(store.get(&waiting.job_id).await, Err(JobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sweep_keeps_recent_jobs() {
        let store = Arc::new(RecordingStore::default());
        let job = store
            .create(file_metadata(), sample_parameters())
            .await
            .unwrap();

        let report = sweeper(store.clone()).sweep_once(Utc::now()).await;
        assert_eq!(report, SweepReport::default());
        assert_eq!(store.get(&job.job_id).await.unwrap().status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_sweep_times_out_stuck_processing_jobs_only() {
        let store = Arc::new(RecordingStore::default());
        let stuck = store
            .create(file_metadata(), sample_parameters())
            .await
            .unwrap();
        store.update(&stuck.job_id, JobUpdate::started()).await.unwrap();
        store.update(&stuck.job_id, JobUpdate::progress(50)).await.unwrap();
        let waiting = store
            .create(file_metadata(), sample_parameters())
            .await
            .unwrap();

        let report = sweeper(store.clone())
            .sweep_once(Utc::now() + ChronoDuration::seconds(901))
            .await;
        assert_eq!(report.timed_out, 1);

        let stuck = store.get(&stuck.job_id).await.unwrap();
        assert_eq!(stuck.status, JobStatus::Failed);
        assert_eq!(stuck.progress, 50);
        assert!(stuck.error.unwrap().contains("timed out"));

        assert_eq!(
            store.get(&waiting.job_id).await.unwrap().status,
            JobStatus::Queued
        );
    }

    #[tokio::test]
    async fn test_recovery_fails_orphans_without_skipping_processing() {
        let store = Arc::new(RecordingStore::default());
        let queued = store
            .create(file_metadata(), sample_parameters())
            .await
            .unwrap();
        let running = store
            .create(file_metadata(), sample_parameters())
            .await
            .unwrap();
        store.update(&running.job_id, JobUpdate::started()).await.unwrap();

        let recovered = recover_interrupted(store.as_ref(), Utc::now() + ChronoDuration::seconds(1))
            .await;
        assert_eq!(recovered, 2);

        for id in [&queued.job_id, &running.job_id] {
            let job = store.get(id).await.unwrap();
            assert_eq!(job.status, JobStatus::Failed);
            assert_eq!(job.error.as_deref(), Some(INTERRUPTED_MESSAGE));
            assert_eq!(
                store.statuses_of(id),
                vec![JobStatus::Queued, JobStatus::Processing, JobStatus::Failed]
            );
        }
    }

    #[tokio::test]
    async fn test_recovery_ignores_finished_jobs() {
        let store = Arc::new(RecordingStore::default());
        let done = store
            .create(file_metadata(), sample_parameters())
            .await
            .unwrap();
        store.update(&done.job_id, JobUpdate::started()).await.unwrap();
        store
            .update(&done.job_id, JobUpdate::completed(sample_result()))
            .await
            .unwrap();

        let recovered = recover_interrupted(store.as_ref(), Utc::now() + ChronoDuration::seconds(1))
            .await;
        assert_eq!(recovered, 0);
        assert_eq!(
            store.get(&done.job_id).await.unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_recovery_skips_jobs_it_cannot_fail() {
        let store = BrokenStore::default();
        let broken = store
            .create(file_metadata(), sample_parameters())
            .await
            .unwrap();
        let healthy = store
            .create(file_metadata(), sample_parameters())
            .await
            .unwrap();
        *store.broken_job.lock().unwrap() = Some(broken.job_id.clone());

        let recovered = recover_interrupted(&store, Utc::now() + ChronoDuration::seconds(1)).await;

        assert_eq!(recovered, 1);
        assert_eq!(
            store.get(&healthy.job_id).await.unwrap().status,
            JobStatus::Failed
        );
        assert_eq!(
            store.get(&broken.job_id).await.unwrap().status,
            JobStatus::Queued
        );
    }

    #[tokio::test]
    async fn test_recovery_survives_a_failed_listing() {
        let store = BrokenStore {
            listing_fails: true,
            ..Default::default()
        };
        store
            .create(file_metadata(), sample_parameters())
            .await
            .unwrap();

        let recovered = recover_interrupted(&store, Utc::now() + ChronoDuration::seconds(1)).await;
        assert_eq!(recovered, 0);
    }
}
