//! Text extraction: turns uploaded PDF bytes into plain text.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

/// Uploads smaller than this are treated as empty or truncated.
pub const MIN_DOCUMENT_BYTES: usize = 100;
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

#[derive(Debug, Error, PartialEq)]
pub enum ExtractionError {
    #[error("File is empty")]
    Empty,

    #[error("File is too short ({0} bytes)")]
    TooShort(usize),

    #[error("Not a valid PDF file")]
    NotPdf,

    #[error("No extractable text found")]
    NoText,

    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// One uploaded document. Owned by the request, handed to the pipeline by value.
#[derive(Debug, Clone)]
pub struct DocumentItem {
    pub filename: String,
    pub bytes: Bytes,
}

impl DocumentItem {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Cheap structural check: non-trivial size and a PDF signature.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.bytes.is_empty() {
            return Err(ExtractionError::Empty);
        }
        if self.bytes.len() < MIN_DOCUMENT_BYTES {
            return Err(ExtractionError::TooShort(self.bytes.len()));
        }
        if !self.bytes.starts_with(PDF_SIGNATURE) {
            return Err(ExtractionError::NotPdf);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub filename: String,
    pub text: String,
    pub success: bool,
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn extracted(filename: &str, text: String) -> Self {
        Self {
            filename: filename.to_string(),
            text,
            success: true,
            error: None,
        }
    }

    pub fn failed(filename: &str, error: impl ToString) -> Self {
        Self {
            filename: filename.to_string(),
            text: String::new(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, filename: &str, bytes: Bytes) -> Result<String, ExtractionError>;
}

/// Runs `extract` for one item and normalizes the outcome: validation failures,
/// extractor errors and whitespace-only text all yield an unsuccessful result.
pub async fn extract_item(extractor: &dyn TextExtractor, item: DocumentItem) -> ExtractionResult {
    if let Err(e) = item.validate() {
        return ExtractionResult::failed(&item.filename, e);
    }
    match extractor.extract(&item.filename, item.bytes).await {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                ExtractionResult::failed(&item.filename, ExtractionError::NoText)
            } else {
                ExtractionResult::extracted(&item.filename, text.to_string())
            }
        }
        Err(e) => ExtractionResult::failed(&item.filename, e),
    }
}

/// `pdf-extract` backend. Parsing is CPU-bound, so it runs on the blocking pool;
/// a panic inside the PDF library surfaces as an extraction error.
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, filename: &str, bytes: Bytes) -> Result<String, ExtractionError> {
        tracing::debug!("Extracting text from {filename} ({} bytes)", bytes.len());
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| ExtractionError::Pdf(format!("extractor task aborted: {e}")))?
            .map_err(|e| ExtractionError::Pdf(e.to_string()))
    }
}
