//! Resume analysis — the AI collaborator seam.
//!
//! The worker only sees `ResumeAnalyzer`. The default backend goes through
//! `LlmClient`; tests swap in scripted analyzers.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::llm_client::{LlmClient, LlmError};

pub mod handlers;
pub mod models;
pub mod prompts;
pub mod settings;
pub mod validation;

use models::{AnalysisParameters, AnalysisResult};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("AI analysis is not configured: ANTHROPIC_API_KEY is not set")]
    MissingCredential,

    #[error("AI analysis request failed: {0}")]
    Llm(LlmError),

    #[error("AI response has an invalid format: {0}")]
    InvalidResponse(String),
}

impl From<LlmError> for AnalysisError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey => AnalysisError::MissingCredential,
            LlmError::Parse(e) => {
                AnalysisError::InvalidResponse(format!("response is not valid JSON ({e})"))
            }
            LlmError::EmptyContent => {
                AnalysisError::InvalidResponse("response has no text content".to_string())
            }
            other => AnalysisError::Llm(other),
        }
    }
}

#[async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        text: &str,
        params: &AnalysisParameters,
    ) -> Result<AnalysisResult, AnalysisError>;
}

/// Analyzer backed by the Anthropic Messages API.
pub struct LlmResumeAnalyzer {
    llm: LlmClient,
}

impl LlmResumeAnalyzer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ResumeAnalyzer for LlmResumeAnalyzer {
    async fn analyze(
        &self,
        text: &str,
        params: &AnalysisParameters,
    ) -> Result<AnalysisResult, AnalysisError> {
        let prompt = prompts::build_analysis_prompt(text, params);
        let system = prompts::analysis_system();

        let raw: serde_json::Value = self.llm.call_json(&prompt, &system).await?;
        let result = validation::normalize_response(&raw, params)?;

        debug!(
            "Resume analysis produced {} fields and {} tags",
            result.extracted_fields.len(),
            result.assigned_tags.len()
        );
        Ok(result)
    }
}
