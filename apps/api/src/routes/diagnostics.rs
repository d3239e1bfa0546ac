//! Diagnostic endpoints: exercise one collaborator at a time, outside the task pipeline.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::screening::extractor::{extract_item, DocumentItem};
use crate::screening::handlers::read_document;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LlmCheckResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractPdfResponse {
    pub filename: String,
    pub extracted_text: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ParseResumeRequest {
    pub resume_text: String,
}

/// Accepts `resume_text` either as a JSON body or as an urlencoded form field.
#[async_trait]
impl<S> FromRequest<S> for ParseResumeRequest
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(body) = Json::<Self>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            Ok(body)
        } else {
            let Form(body) = Form::<Self>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            Ok(body)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParseResumeResponse {
    pub parsed: Value,
}

#[derive(Debug, Serialize)]
pub struct ParseResumeFileResponse {
    pub filename: String,
    pub extracted_text_length: usize,
    pub parsed_data: Value,
}

/// GET /api/test/llm
pub async fn handle_llm_check(
    State(state): State<AppState>,
) -> Result<Json<LlmCheckResponse>, AppError> {
    let response = state
        .llm
        .ping()
        .await
        .map_err(|e| AppError::Llm(format!("Connectivity check failed: {e}")))?;
    Ok(Json(LlmCheckResponse { response }))
}

/// POST /api/test/extract-pdf
///
/// Multipart body with a single `file` field.
pub async fn handle_extract_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractPdfResponse>, AppError> {
    let item = read_file_field(multipart).await?;
    let result = extract_item(state.extractor.as_ref(), item).await;
    Ok(Json(ExtractPdfResponse {
        filename: result.filename,
        extracted_text: result.text,
        success: result.success,
        error: result.error,
    }))
}

/// POST /api/test/parse-resume-file
///
/// Extraction and parsing of one uploaded PDF, without scoring or a task.
pub async fn handle_parse_resume_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ParseResumeFileResponse>, AppError> {
    let item = read_file_field(multipart).await?;
    let extracted = extract_item(state.extractor.as_ref(), item).await;
    if !extracted.success {
        return Err(AppError::UnprocessableEntity(format!(
            "{}: {}",
            extracted.filename,
            extracted.error.unwrap_or_default()
        )));
    }

    let parsed_data = state
        .parser
        .parse(&extracted.text)
        .await
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;
    Ok(Json(ParseResumeFileResponse {
        filename: extracted.filename,
        extracted_text_length: extracted.text.chars().count(),
        parsed_data,
    }))
}

/// POST /api/test/parse-resume
pub async fn handle_parse_resume(
    State(state): State<AppState>,
    request: ParseResumeRequest,
) -> Result<Json<ParseResumeResponse>, AppError> {
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }
    let parsed = state
        .parser
        .parse(&request.resume_text)
        .await
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;
    Ok(Json(ParseResumeResponse { parsed }))
}

/// First `file` field of a multipart body.
async fn read_file_field(mut multipart: Multipart) -> Result<DocumentItem, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            return read_document(field).await;
        }
    }
    Err(AppError::Validation("file field is required".to_string()))
}
