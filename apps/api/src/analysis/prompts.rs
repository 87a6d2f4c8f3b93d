// LLM prompt templates for resume analysis.
// Reuses the JSON-only fragment from llm_client::prompts.

use crate::analysis::models::AnalysisParameters;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// System prompt for resume analysis.
pub fn analysis_system() -> String {
    format!(
        "You are an experienced technical recruiter reviewing a candidate's resume. \
        Summarize the candidate, extract the requested fields and classify the resume \
        with tags taken only from the provided vocabulary. {JSON_ONLY_SYSTEM}"
    )
}

/// Resume analysis prompt template. `{fields}`, `{tags}` and `{resume_text}` are
/// substituted by `build_analysis_prompt`.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the following resume.

FIELDS TO EXTRACT (use these exact keys):
{fields}

TAG VOCABULARY (assign only tags from this list, may be empty):
{tags}

RESUME TEXT:
{resume_text}

Return a JSON object with this EXACT schema (no extra fields):
{
  "summary": "2-4 sentence professional summary of the candidate",
  "extractedFields": {
    "<field key>": "value found in the resume, or an empty string if absent"
  },
  "assignedTags": ["tag from the vocabulary"]
}

Rules:
- Every field key listed above MUST appear in "extractedFields".
- Values are plain strings. Join multiple values with ", ".
- Never invent information that is not present in the resume text.
- "assignedTags" must only contain tags from the vocabulary, spelled exactly as given."#;

/// Renders the analysis prompt for one resume.
pub fn build_analysis_prompt(resume_text: &str, params: &AnalysisParameters) -> String {
    let fields = params
        .fields
        .iter()
        .map(|f| match &f.description {
            Some(desc) if !desc.trim().is_empty() => {
                format!("- {}: {} ({})", f.key, f.label, desc.trim())
            }
            _ => format!("- {}: {}", f.key, f.label),
        })
        .collect::<Vec<_>>()
        .join("\n");

    let tags = if params.tags.is_empty() {
        "(none)".to_string()
    } else {
        params.tags.join(", ")
    };

    ANALYSIS_PROMPT_TEMPLATE
        .replace("{fields}", &fields)
        .replace("{tags}", &tags)
        .replace("{resume_text}", resume_text.trim())
}
