//! Fixtures shared by the job pipeline tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::analysis::models::{AnalysisParameters, AnalysisResult, FieldDefinition};
use crate::analysis::validation::normalize_response;
use crate::analysis::{AnalysisError, ResumeAnalyzer};
use crate::extraction::{DocumentFormat, ExtractionError, TextExtractor};
use crate::jobs::models::{FileMetadata, Job, JobStatus, JobUpdate};
use crate::jobs::processor::JobProcessor;
use crate::jobs::store::{JobStore, MemoryJobStore};
use crate::jobs::JobError;

pub fn file_metadata() -> FileMetadata {
    FileMetadata {
        name: "resume.pdf".to_string(),
        size: 2048,
        mime_type: "application/pdf".to_string(),
    }
}

pub fn sample_parameters() -> AnalysisParameters {
    AnalysisParameters {
        fields: vec![
            FieldDefinition {
                key: "email".to_string(),
                label: "Email address".to_string(),
                description: None,
            },
            FieldDefinition {
                key: "years_experience".to_string(),
                label: "Years of experience".to_string(),
                description: Some("Total professional years".to_string()),
            },
        ],
        tags: vec!["Backend".to_string(), "Senior".to_string()],
    }
}

pub fn sample_result() -> AnalysisResult {
    AnalysisResult {
        summary: "Senior backend engineer.".to_string(),
        extracted_fields: [
            ("email".to_string(), "jane@example.com".to_string()),
            ("years_experience".to_string(), "8".to_string()),
        ]
        .into_iter()
        .collect(),
        assigned_tags: vec!["Backend".to_string()],
    }
}

/// A well-formed AI payload, including a tag outside the vocabulary.
pub fn well_formed_response() -> Value {
    json!({
        "summary": "Senior backend engineer with 8 years of Rust.",
        "extractedFields": {"email": "jane@example.com", "years_experience": 8},
        "assignedTags": ["backend", "Astronaut"]
    })
}

/// Treats the uploaded bytes as the resume text. Bytes starting with
/// `CORRUPT` fail like an unreadable file.
pub struct EchoExtractor;

#[async_trait]
impl TextExtractor for EchoExtractor {
    async fn extract(
        &self,
        content: Bytes,
        format: DocumentFormat,
    ) -> Result<String, ExtractionError> {
        if content.starts_with(b"CORRUPT") {
            return Err(match format {
                DocumentFormat::Pdf => ExtractionError::Pdf("invalid file header".to_string()),
                DocumentFormat::Docx => ExtractionError::Docx("invalid archive".to_string()),
            });
        }
        Ok(String::from_utf8_lossy(&content).into_owned())
    }
}

/// Returns a fixed raw payload after an optional delay, run through the same
/// normalization as the real analyzer.
pub struct ScriptedAnalyzer {
    pub response: Value,
    pub delay: Duration,
    pub calls: Mutex<Vec<(String, AnalysisParameters)>>,
}

impl ScriptedAnalyzer {
    pub fn new(response: Value) -> Self {
        Self {
            response,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ResumeAnalyzer for ScriptedAnalyzer {
    async fn analyze(
        &self,
        text: &str,
        params: &AnalysisParameters,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), params.clone()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        normalize_response(&self.response, params)
    }
}

/// Panics inside the worker, to prove one job cannot take the loop down.
pub struct PanickingAnalyzer;

#[async_trait]
impl ResumeAnalyzer for PanickingAnalyzer {
    async fn analyze(
        &self,
        _text: &str,
        _params: &AnalysisParameters,
    ) -> Result<AnalysisResult, AnalysisError> {
        panic!("analyzer exploded");
    }
}

/// One observed write: job id, status and progress after the write.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
}

/// Memory store that records every successful write in order.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryJobStore,
    log: Mutex<Vec<Observation>>,
}

impl RecordingStore {
    pub fn observations(&self) -> Vec<Observation> {
        self.log.lock().unwrap().clone()
    }

    pub fn statuses_of(&self, job_id: &str) -> Vec<JobStatus> {
        let mut statuses: Vec<JobStatus> = Vec::new();
        for obs in self.observations().into_iter().filter(|o| o.job_id == job_id) {
            if statuses.last() != Some(&obs.status) {
                statuses.push(obs.status);
            }
        }
        statuses
    }

    fn record(&self, job: &Job) {
        self.log.lock().unwrap().push(Observation {
            job_id: job.job_id.clone(),
            status: job.status,
            progress: job.progress,
        });
    }
}

#[async_trait]
impl JobStore for RecordingStore {
    async fn create(
        &self,
        file: FileMetadata,
        parameters: AnalysisParameters,
    ) -> Result<Job, JobError> {
        let job = self.inner.create(file, parameters).await?;
        self.record(&job);
        Ok(job)
    }

    async fn get(&self, job_id: &str) -> Result<Job, JobError> {
        self.inner.get(job_id).await
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<Job, JobError> {
        let job = self.inner.update(job_id, update).await?;
        self.record(&job);
        Ok(job)
    }

    async fn purge_expired(&self, created_before: DateTime<Utc>) -> Result<u64, JobError> {
        self.inner.purge_expired(created_before).await
    }

    async fn list_unfinished(
        &self,
        statuses: &[JobStatus],
        updated_before: DateTime<Utc>,
    ) -> Result<Vec<Job>, JobError> {
        self.inner.list_unfinished(statuses, updated_before).await
    }
}

pub fn processor(
    store: Arc<dyn JobStore>,
    analyzer: Arc<dyn ResumeAnalyzer>,
) -> JobProcessor {
    JobProcessor::new(store, Arc::new(EchoExtractor), analyzer)
}

/// Polls until the job is terminal. Panics after ~5s of (paused-clock aware) waiting.
pub async fn wait_for_terminal(store: &dyn JobStore, job_id: &str) -> Job {
    for _ in 0..500 {
        let job = store.get(job_id).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not reach a terminal state");
}
