use std::sync::Arc;

use crate::analysis::settings::SettingsStore;
use crate::config::Config;
use crate::jobs::queue::JobQueue;
use crate::jobs::store::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Job ledger. Postgres when `DATABASE_URL` is set, process memory otherwise.
    pub store: Arc<dyn JobStore>,
    /// Submission side of the single-worker job queue.
    pub queue: JobQueue,
    pub settings: SettingsStore,
    pub config: Config,
}
