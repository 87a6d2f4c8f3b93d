use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::analysis::models::{AnalysisParameters, FieldDefinition};
use crate::errors::AppError;
use crate::jobs::status::{get_status, JobStatusView};
use crate::jobs::submission::{submit_job, SubmissionReceipt, SubmissionRequest};
use crate::state::AppState;

struct UploadedFile {
    name: String,
    content_type: Option<String>,
    content: Bytes,
}

/// Parts of the upload form. Unknown parts are ignored.
#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    fields: Option<Vec<FieldDefinition>>,
    tags: Option<Vec<String>>,
}

fn parse_json_part<T: DeserializeOwned>(part: &str, raw: &str) -> Result<T, AppError> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Validation(format!("Part '{part}' is not valid JSON: {e}")))
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let part = field.name().map(str::to_string);
        match part.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let content = field.bytes().await?;
                form.file = Some(UploadedFile {
                    name,
                    content_type,
                    content,
                });
            }
            Some("fields") => {
                let raw = field.text().await?;
                form.fields = Some(parse_json_part("fields", &raw)?);
            }
            Some("tags") => {
                let raw = field.text().await?;
                form.tags = Some(parse_json_part("tags", &raw)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/v1/analysis/jobs
///
/// Accepts a resume upload and answers 202 with the job id; the analysis runs
/// in the background.
pub async fn handle_submit_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmissionReceipt>), AppError> {
    let form = read_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::Validation("Missing 'file' part".to_string()))?;

    // Parameters are fixed here; later settings edits never reach this job.
    let defaults = state.settings.snapshot().await;
    let parameters = AnalysisParameters {
        fields: form.fields.unwrap_or(defaults.fields),
        tags: form.tags.unwrap_or(defaults.tags),
    };

    let receipt = submit_job(
        state.store.as_ref(),
        &state.queue,
        SubmissionRequest {
            file_name: file.name,
            declared_mime: file.content_type,
            content: file.content,
            parameters,
        },
        state.config.max_upload_bytes,
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// GET /api/v1/analysis/jobs/:job_id
pub async fn handle_get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusView>, AppError> {
    let view = get_status(
        state.store.as_ref(),
        &job_id,
        state.config.job_time_budget_secs as i64,
    )
    .await?;
    Ok(Json(view))
}
