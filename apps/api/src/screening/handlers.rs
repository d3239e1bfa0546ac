//! Axum route handlers for the Scoring API.

use std::collections::BTreeMap;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::screening::extractor::DocumentItem;
use crate::screening::orchestrator::TaskResults;
use crate::screening::task::{Task, TaskStatusView};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ProcessBatchResponse {
    pub task_id: Uuid,
    pub status: &'static str,
    pub total_resumes: usize,
    pub estimated_completion_time: String,
    pub processing_rate: String,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: BTreeMap<Uuid, Task>,
}

#[derive(Debug, Serialize)]
pub struct ClearTasksResponse {
    pub cleared: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/scoring/process-batch
///
/// Multipart body: a `job_description` text field plus one or more `files`.
/// Returns as soon as the task is registered; poll status for progress.
pub async fn handle_process_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProcessBatchResponse>, AppError> {
    let (job_description, items) = read_batch_form(multipart).await?;
    let job_description = job_description
        .ok_or_else(|| AppError::Validation("job_description is required".to_string()))?;

    let submission = state.orchestrator.submit(job_description, items).await?;

    Ok(Json(ProcessBatchResponse {
        task_id: submission.task_id,
        status: "processing_started",
        total_resumes: submission.total_items,
        estimated_completion_time: submission.estimated_time,
        processing_rate: submission.processing_rate,
    }))
}

/// GET /api/scoring/status/:task_id
pub async fn handle_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusView>, AppError> {
    let task_id = parse_task_id(&task_id)?;
    Ok(Json(state.orchestrator.status(task_id).await?))
}

/// GET /api/scoring/results/:task_id
///
/// 400 with the current status until the task has completed.
pub async fn handle_task_results(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResults>, AppError> {
    let task_id = parse_task_id(&task_id)?;
    Ok(Json(state.orchestrator.results(task_id).await?))
}

/// GET /api/scoring/list-tasks
pub async fn handle_list_tasks(State(state): State<AppState>) -> Json<TaskListResponse> {
    let tasks = state
        .orchestrator
        .list()
        .await
        .into_iter()
        .map(|t| (t.id, t))
        .collect();
    Json(TaskListResponse { tasks })
}

/// DELETE /api/scoring/tasks
pub async fn handle_clear_tasks(State(state): State<AppState>) -> Json<ClearTasksResponse> {
    Json(ClearTasksResponse {
        cleared: state.orchestrator.clear().await,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Identifiers that are not UUIDs cannot name a task.
fn parse_task_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Task {raw} not found")))
}

async fn read_batch_form(
    mut multipart: Multipart,
) -> Result<(Option<String>, Vec<DocumentItem>), AppError> {
    let mut job_description = None;
    let mut items = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("job_description") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid job_description: {e}")))?;
                job_description = Some(text);
            }
            Some("files") | Some("file") => {
                items.push(read_document(field).await?);
            }
            other => tracing::debug!("Ignoring multipart field {other:?}"),
        }
    }

    Ok((job_description, items))
}

pub(crate) async fn read_document(
    field: axum::extract::multipart::Field<'_>,
) -> Result<DocumentItem, AppError> {
    let filename = field
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| "unnamed.pdf".to_string());
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read {filename}: {e}")))?;
    Ok(DocumentItem::new(filename, bytes))
}
