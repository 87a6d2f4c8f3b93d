use axum::{extract::State, Json};
use tracing::info;

use crate::analysis::models::AnalysisParameters;
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/analysis/settings
pub async fn handle_get_settings(State(state): State<AppState>) -> Json<AnalysisParameters> {
    Json(state.settings.snapshot().await)
}

/// PUT /api/v1/analysis/settings
///
/// Replaces the admin field/tag configuration used by future submissions.
pub async fn handle_put_settings(
    State(state): State<AppState>,
    Json(params): Json<AnalysisParameters>,
) -> Result<Json<AnalysisParameters>, AppError> {
    params.validate().map_err(AppError::Validation)?;

    info!(
        "Analysis settings updated: {} fields, {} tags",
        params.fields.len(),
        params.tags.len()
    );
    state.settings.replace(params.clone()).await;
    Ok(Json(params))
}
