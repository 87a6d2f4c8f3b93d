//! Structural check and normalization of the AI collaborator's response.
//!
//! The model is asked for `{summary, extractedFields, assignedTags}`. Anything
//! that does not have that shape is rejected; anything that does is coerced so
//! every requested field key is present and tags come only from the vocabulary.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::analysis::models::{AnalysisParameters, AnalysisResult};
use crate::analysis::AnalysisError;

pub fn normalize_response(
    raw: &Value,
    params: &AnalysisParameters,
) -> Result<AnalysisResult, AnalysisError> {
    let object = raw
        .as_object()
        .ok_or_else(|| invalid("expected a JSON object"))?;

    let summary = object
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .ok_or_else(|| invalid("'summary' must be a string"))?;
    if summary.is_empty() {
        return Err(invalid("'summary' is empty"));
    }

    let fields = object
        .get("extractedFields")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("'extractedFields' must be an object"))?;

    let tags = object
        .get("assignedTags")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("'assignedTags' must be an array"))?;

    let extracted_fields: BTreeMap<String, String> = params
        .field_keys()
        .map(|key| {
            let value = fields.get(key).map(value_to_string).unwrap_or_default();
            (key.to_string(), value)
        })
        .collect();

    let mut seen = HashSet::new();
    let assigned_tags = tags
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|tag| canonical_tag(tag, &params.tags))
        .filter(|tag| seen.insert(tag.clone()))
        .collect();

    Ok(AnalysisResult {
        summary: summary.to_string(),
        extracted_fields,
        assigned_tags,
    })
}

fn invalid(reason: &str) -> AnalysisError {
    AnalysisError::InvalidResponse(reason.to_string())
}

/// Maps a model-produced tag onto the vocabulary spelling, case-insensitively.
fn canonical_tag(tag: &str, vocabulary: &[String]) -> Option<String> {
    let tag = tag.trim();
    vocabulary
        .iter()
        .find(|v| v.trim().eq_ignore_ascii_case(tag))
        .map(|v| v.trim().to_string())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
