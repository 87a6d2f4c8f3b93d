use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// One field the AI is asked to pull out of a resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Field definitions plus tag vocabulary. Snapshotted into every job at submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisParameters {
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AnalysisParameters {
    /// Checks that the parameters describe something the AI can actually be asked.
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err("At least one extraction field must be configured".to_string());
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            let key = field.key.trim();
            if key.is_empty() {
                return Err("Extraction field keys cannot be empty".to_string());
            }
            // Keys are used verbatim in the prompt and the result map.
            if key != field.key {
                return Err(format!(
                    "Extraction field key '{}' has leading or trailing whitespace",
                    field.key
                ));
            }
            if field.label.trim().is_empty() {
                return Err(format!("Extraction field '{key}' has no label"));
            }
            if !seen.insert(key.to_string()) {
                return Err(format!("Extraction field '{key}' is defined more than once"));
            }
        }

        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err("Tags cannot be empty strings".to_string());
        }

        Ok(())
    }

    pub fn field_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }
}

/// The contract shape returned by the AI collaborator once normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub extracted_fields: BTreeMap<String, String>,
    pub assigned_tags: Vec<String>,
}
