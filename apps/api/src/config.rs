use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Only the tuning knobs have defaults; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When unset, jobs live in process memory.
    pub database_url: Option<String>,
    /// Credential for the AI collaborator. When unset, analysis jobs fail.
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    /// Jobs older than this (from creation) are purged, whatever their status.
    pub job_retention_hours: u64,
    /// A `processing` job with no update for this long is force-failed.
    pub job_stale_after_secs: u64,
    pub sweep_interval_secs: u64,
    /// Total-time budget used for `estimatedTimeRemaining`.
    pub job_time_budget_secs: u64,
    pub max_upload_bytes: usize,
    /// Optional JSON file seeding the admin field/tag settings.
    pub analysis_settings_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            job_retention_hours: parse_env("JOB_RETENTION_HOURS", 24)?,
            job_stale_after_secs: parse_env("JOB_STALE_AFTER_SECS", 900)?,
            sweep_interval_secs: parse_env("SWEEP_INTERVAL_SECS", 300)?,
            job_time_budget_secs: parse_env("JOB_TIME_BUDGET_SECS", 60)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            analysis_settings_path: optional_env("ANALYSIS_SETTINGS_PATH"),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}
