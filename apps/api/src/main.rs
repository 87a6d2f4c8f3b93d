mod analysis;
mod config;
mod db;
mod errors;
mod extraction;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use chrono::Utc;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::analysis::settings::SettingsStore;
use crate::analysis::LlmResumeAnalyzer;
use crate::config::Config;
use crate::db::create_pool;
use crate::extraction::DocumentTextExtractor;
use crate::jobs::pg_store::PgJobStore;
use crate::jobs::processor::JobProcessor;
use crate::jobs::queue::JobQueue;
use crate::jobs::store::{JobStore, MemoryJobStore};
use crate::jobs::sweeper::{recover_interrupted, Sweeper};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Admin field/tag configuration
    let settings = SettingsStore::load(config.analysis_settings_path.as_deref()).await?;

    // Job ledger: Postgres when configured, otherwise process memory
    let store: Arc<dyn JobStore> = match config.database_url.as_deref() {
        Some(url) => Arc::new(PgJobStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; jobs are kept in memory and lost on restart");
            Arc::new(MemoryJobStore::new())
        }
    };

    // Nothing from a previous process is still running
    recover_interrupted(store.as_ref(), Utc::now()).await;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    if llm.has_api_key() {
        info!("LLM client initialized (model: {})", llm_client::MODEL);
    } else {
        warn!("ANTHROPIC_API_KEY not set; analysis jobs will fail until it is configured");
    }

    // Start the single job worker
    let processor = JobProcessor::new(
        Arc::clone(&store),
        Arc::new(DocumentTextExtractor),
        Arc::new(LlmResumeAnalyzer::new(llm)),
    );
    let (queue, worker) = JobQueue::start(processor);

    let sweeper = Sweeper::from_config(Arc::clone(&store), &config).spawn();

    // Build app state
    let state = AppState {
        store,
        queue,
        settings,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let the job in flight finish; anything still queued is recovered next start
    worker.stop().await;
    sweeper.abort();
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
