use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::RwLock;
use tracing::info;

use crate::analysis::models::AnalysisParameters;

/// Admin-configured field definitions and tag vocabulary.
///
/// Submissions take a clone of the current value, so edits here never reach
/// jobs that already exist.
#[derive(Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<AnalysisParameters>>,
}

impl SettingsStore {
    pub fn new(initial: AnalysisParameters) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Seeds the store from a JSON file, or starts empty when no path is given.
    pub async fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read analysis settings from {path}"))?;
        let params: AnalysisParameters = serde_json::from_str(&raw)
            .with_context(|| format!("Analysis settings in {path} are not valid JSON"))?;
        params
            .validate()
            .map_err(|reason| anyhow::anyhow!("Analysis settings in {path} are invalid: {reason}"))?;

        info!(
            "Loaded analysis settings from {path}: {} fields, {} tags",
            params.fields.len(),
            params.tags.len()
        );
        Ok(Self::new(params))
    }

    pub async fn snapshot(&self) -> AnalysisParameters {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, params: AnalysisParameters) {
        *self.inner.write().await = params;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::FieldDefinition;

    fn params(key: &str) -> AnalysisParameters {
        AnalysisParameters {
            fields: vec![FieldDefinition {
                key: key.to_string(),
                label: key.to_string(),
                description: None,
            }],
            tags: vec!["rust".to_string()],
        }
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_from_later_edits() {
        let store = SettingsStore::new(params("email"));
        let snapshot = store.snapshot().await;

        store.replace(params("phone")).await;

        assert_eq!(snapshot.fields[0].key, "email");
        assert_eq!(store.snapshot().await.fields[0].key, "phone");
    }

    #[tokio::test]
    async fn test_load_without_path_is_empty() {
        let store = SettingsStore::load(None).await.unwrap();
        assert_eq!(store.snapshot().await, AnalysisParameters::default());
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let result = SettingsStore::load(Some("/nonexistent/screener-settings.json")).await;
        assert!(result.is_err());
    }
}
