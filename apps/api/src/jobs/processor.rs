//! Job Processor — runs one queued job to a terminal state.
//!
//! extraction → analysis → finalization, strictly in order. Every failure is
//! absorbed here and written to the job as `failed`; nothing escapes to the
//! queue loop.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::analysis::models::AnalysisParameters;
use crate::analysis::{AnalysisError, ResumeAnalyzer};
use crate::extraction::{DocumentFormat, ExtractionError, TextExtractor};
use crate::jobs::models::JobUpdate;
use crate::jobs::store::JobStore;
use crate::jobs::JobError;

// Coarse milestones for pollers. Not a measurement of sub-task progress.
pub const EXTRACTED_PROGRESS: u8 = 30;
pub const ANALYZING_PROGRESS: u8 = 50;
pub const ANALYZED_PROGRESS: u8 = 90;

/// Everything the worker needs to run a job. Handed over at submission.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: String,
    pub content: Bytes,
    pub format: DocumentFormat,
    pub parameters: AnalysisParameters,
}

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Store(#[from] JobError),
}

pub struct JobProcessor {
    store: Arc<dyn JobStore>,
    extractor: Arc<dyn TextExtractor>,
    analyzer: Arc<dyn ResumeAnalyzer>,
}

impl JobProcessor {
    pub fn new(
        store: Arc<dyn JobStore>,
        extractor: Arc<dyn TextExtractor>,
        analyzer: Arc<dyn ResumeAnalyzer>,
    ) -> Self {
        Self {
            store,
            extractor,
            analyzer,
        }
    }

    /// Runs the job and records the outcome. Never returns an error.
    pub async fn process(&self, job: QueuedJob) {
        let job_id = job.job_id.clone();
        info!("Processing job {job_id} ({} bytes, {})", job.content.len(), job.format);

        match self.run(job).await {
            Ok(()) => info!("Job {job_id} completed"),
            Err(e) => {
                warn!("Job {job_id} failed: {e}");
                self.record_failure(&job_id, &e.to_string()).await;
            }
        }
    }

    /// Writes a terminal failure. Losing the write to a record that is already
    /// terminal (e.g. force-failed by the sweeper) is expected and only logged.
    pub async fn record_failure(&self, job_id: &str, message: &str) {
        match self.store.update(job_id, JobUpdate::failed(message)).await {
            Ok(_) => {}
            Err(e @ JobError::Terminal { .. }) => warn!("Could not record failure: {e}"),
            Err(e) => error!("Could not record failure for job {job_id}: {e}"),
        }
    }

    async fn run(&self, job: QueuedJob) -> Result<(), ProcessingError> {
        let QueuedJob {
            job_id,
            content,
            format,
            parameters,
        } = job;

        self.store.update(&job_id, JobUpdate::started()).await?;

        let text = self.extractor.extract(content, format).await?;
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText.into());
        }
        self.store
            .update(&job_id, JobUpdate::progress(EXTRACTED_PROGRESS))
            .await?;

        self.store
            .update(&job_id, JobUpdate::progress(ANALYZING_PROGRESS))
            .await?;
        let result = self.analyzer.analyze(&text, &parameters).await?;
        self.store
            .update(&job_id, JobUpdate::progress(ANALYZED_PROGRESS))
            .await?;

        self.store
            .update(&job_id, JobUpdate::completed(result))
            .await?;
        Ok(())
    }
}
