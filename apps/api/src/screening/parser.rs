//! Structured resume parsing via the LLM.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::llm_client::{LlmClient, LlmError};
use crate::screening::extractor::ExtractionResult;
use crate::screening::prompts::{RESUME_PARSE_PROMPT, RESUME_PARSE_SYSTEM};

/// Below this many characters a resume cannot be parsed meaningfully.
pub const MIN_RESUME_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Insufficient text content for parsing ({0} chars)")]
    InsufficientText(usize),

    #[error("Invalid JSON format from LLM: {0}")]
    Malformed(String),

    #[error("LLM returned an empty record")]
    EmptyRecord,

    #[error("LLM reported a parsing error: {0}")]
    Reported(String),

    #[error("LLM request failed: {0}")]
    Request(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedRecord {
    pub filename: String,
    pub data: Value,
    pub success: bool,
    pub error: Option<String>,
}

impl ParsedRecord {
    pub fn parsed(filename: &str, data: Value) -> Self {
        Self {
            filename: filename.to_string(),
            data,
            success: true,
            error: None,
        }
    }

    pub fn failed(filename: &str, error: impl ToString) -> Self {
        Self {
            filename: filename.to_string(),
            data: Value::Object(Default::default()),
            success: false,
            error: Some(error.to_string()),
        }
    }

    /// The candidate's name as parsed, or "Unknown".
    pub fn candidate_name(&self) -> String {
        self.data
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Unknown")
            .to_string()
    }
}

#[async_trait]
pub trait ResumeParser: Send + Sync {
    /// Converts resume text into a structured JSON object.
    async fn parse(&self, resume_text: &str) -> Result<Value, ParseError>;
}

/// Parses one extracted document, applying the shape checks every backend shares.
pub async fn parse_item(parser: &dyn ResumeParser, extracted: &ExtractionResult) -> ParsedRecord {
    let text = extracted.text.trim();
    let chars = text.chars().count();
    if chars < MIN_RESUME_CHARS {
        return ParsedRecord::failed(&extracted.filename, ParseError::InsufficientText(chars));
    }

    match parser.parse(text).await.and_then(check_record) {
        Ok(data) => ParsedRecord::parsed(&extracted.filename, data),
        Err(e) => ParsedRecord::failed(&extracted.filename, e),
    }
}

/// A usable record is a non-empty JSON object without an `error` key.
fn check_record(data: Value) -> Result<Value, ParseError> {
    let object = data
        .as_object()
        .ok_or_else(|| ParseError::Malformed(format!("expected a JSON object, got {data}")))?;
    if object.is_empty() {
        return Err(ParseError::EmptyRecord);
    }
    if let Some(reported) = object.get("error") {
        let message = reported
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| reported.to_string());
        return Err(ParseError::Reported(message));
    }
    Ok(data)
}

pub struct LlmResumeParser {
    llm: LlmClient,
}

impl LlmResumeParser {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ResumeParser for LlmResumeParser {
    async fn parse(&self, resume_text: &str) -> Result<Value, ParseError> {
        let prompt = RESUME_PARSE_PROMPT.replace("{resume_text}", resume_text);
        self.llm
            .call_json::<Value>(&prompt, RESUME_PARSE_SYSTEM)
            .await
            .map_err(|e| match e {
                LlmError::Parse(inner) => ParseError::Malformed(inner.to_string()),
                LlmError::EmptyContent => ParseError::EmptyRecord,
                other => ParseError::Request(other.to_string()),
            })
    }
}
