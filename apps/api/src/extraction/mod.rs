//! Text extraction — turns uploaded resume bytes into plain text.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod docx;
pub mod pdf;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Upload formats the pipeline knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        if essence.eq_ignore_ascii_case(PDF_MIME) {
            Some(DocumentFormat::Pdf)
        } else if essence.eq_ignore_ascii_case(DOCX_MIME) {
            Some(DocumentFormat::Docx)
        } else {
            None
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, extension) = name.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }

    /// Resolves the format of an upload. The declared MIME type wins; the file
    /// extension is only consulted when the client sent no useful type.
    pub fn detect(declared_mime: Option<&str>, file_name: &str) -> Option<Self> {
        match declared_mime.map(str::trim) {
            Some(mime) if !mime.is_empty() && !mime.starts_with("application/octet-stream") => {
                Self::from_mime(mime)
            }
            _ => Self::from_file_name(file_name),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => PDF_MIME,
            DocumentFormat::Docx => DOCX_MIME,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => write!(f, "PDF"),
            DocumentFormat::Docx => write!(f, "DOCX"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    #[error("Failed to read DOCX: {0}")]
    Docx(String),

    #[error("Could not extract any text from the uploaded file")]
    EmptyText,

    #[error("Text extraction crashed: {0}")]
    Crashed(String),
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, content: Bytes, format: DocumentFormat)
        -> Result<String, ExtractionError>;
}

/// Default extractor. Parsing is CPU-bound, so it runs on the blocking pool;
/// a parser panic surfaces as `ExtractionError::Crashed` instead of taking the
/// worker down.
pub struct DocumentTextExtractor;

#[async_trait]
impl TextExtractor for DocumentTextExtractor {
    async fn extract(
        &self,
        content: Bytes,
        format: DocumentFormat,
    ) -> Result<String, ExtractionError> {
        tokio::task::spawn_blocking(move || match format {
            DocumentFormat::Pdf => pdf::extract_text(&content),
            DocumentFormat::Docx => docx::extract_text(&content),
        })
        .await
        .map_err(|e| ExtractionError::Crashed(format!("{format} parser panicked: {e}")))?
    }
}
