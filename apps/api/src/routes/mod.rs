pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

/// Room for multipart boundaries and the `fields`/`tags` parts on top of the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis jobs
        .route(
            "/api/v1/analysis/jobs",
            post(jobs::handle_submit_job).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/analysis/jobs/:job_id",
            get(jobs::handle_get_job_status),
        )
        // Admin settings
        .route(
            "/api/v1/analysis/settings",
            get(analysis::handle_get_settings).put(analysis::handle_put_settings),
        )
        .with_state(state)
}
