//! Submission — validates an upload, records the job and hands it to the queue.
//!
//! Everything that can be rejected is rejected here, before a job exists.

use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::analysis::models::AnalysisParameters;
use crate::errors::AppError;
use crate::extraction::DocumentFormat;
use crate::jobs::models::{FileMetadata, JobStatus};
use crate::jobs::processor::QueuedJob;
use crate::jobs::queue::JobQueue;
use crate::jobs::store::JobStore;

pub struct SubmissionRequest {
    pub file_name: String,
    pub declared_mime: Option<String>,
    pub content: Bytes,
    pub parameters: AnalysisParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub job_id: String,
    pub status: JobStatus,
}

pub async fn submit_job(
    store: &dyn JobStore,
    queue: &JobQueue,
    request: SubmissionRequest,
    max_upload_bytes: usize,
) -> Result<SubmissionReceipt, AppError> {
    let SubmissionRequest {
        file_name,
        declared_mime,
        content,
        parameters,
    } = request;

    let format = DocumentFormat::detect(declared_mime.as_deref(), &file_name).ok_or_else(|| {
        AppError::UnsupportedMediaType(format!(
            "'{}' is not a supported resume format; upload a PDF or DOCX file",
            declared_mime.as_deref().unwrap_or(file_name.as_str())
        ))
    })?;

    if content.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if content.len() > max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "Uploaded file is {} bytes; the limit is {max_upload_bytes} bytes",
            content.len()
        )));
    }
    parameters.validate().map_err(AppError::Validation)?;

    // Record what the client declared; the detected type only fills a gap.
    let mime_type = declared_mime
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format.mime_type().to_string());
    let file = FileMetadata {
        name: file_name,
        size: content.len() as u64,
        mime_type,
    };
    let job = store.create(file, parameters.clone()).await?;

    queue.enqueue(QueuedJob {
        job_id: job.job_id.clone(),
        content,
        format,
        parameters,
    })?;

    info!(
        "Accepted {format} resume '{}' as job {} (queue depth {})",
        job.file.name,
        job.job_id,
        queue.depth()
    );

    Ok(SubmissionReceipt {
        job_id: job.job_id,
        status: job.status,
    })
}
