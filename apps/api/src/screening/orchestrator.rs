//! Batch Orchestrator: owns the task lifecycle.
//!
//! Flow: submit → create task (processing) → spawn pipeline →
//!       extracting_text → parsing_resumes → scoring_candidates → completed.
//!
//! Each stage runs over the full survivor set of the previous one. Documents that
//! fail extraction or parsing are recorded on the task and dropped; the task only
//! fails when a stage leaves no survivors. Errors and panics inside the pipeline
//! are caught at the task boundary and recorded as `failed`.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::screening::archive::{archive_batch, folder_name, ResumeArchive};
use crate::screening::extractor::{extract_item, DocumentItem, ExtractionResult, TextExtractor};
use crate::screening::parser::{parse_item, ParsedRecord, ResumeParser};
use crate::screening::registry::TaskStore;
use crate::screening::scorer::{BatchScorer, CandidateResult};
use crate::screening::task::{
    FailureStage, ItemFailure, Task, TaskError, TaskStatus, TaskStatusView,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Text extraction failed for all {total} documents: {reasons}")]
    NoTextExtracted { total: usize, reasons: String },

    #[error("Resume parsing failed for all {total} extracted documents: {reasons}")]
    NoResumesParsed { total: usize, reasons: String },

    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Returned to the client as soon as the task is registered.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub task_id: Uuid,
    pub total_items: usize,
    pub estimated_completion_secs: u64,
    pub estimated_time: String,
    pub processing_rate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskResults {
    pub task_id: Uuid,
    pub results: Vec<CandidateResult>,
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn TaskStore>,
    extractor: Arc<dyn TextExtractor>,
    parser: Arc<dyn ResumeParser>,
    scorer: Arc<BatchScorer>,
    archive: Option<Arc<dyn ResumeArchive>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn TaskStore>,
        extractor: Arc<dyn TextExtractor>,
        parser: Arc<dyn ResumeParser>,
        scorer: Arc<BatchScorer>,
    ) -> Self {
        Self {
            store,
            extractor,
            parser,
            scorer,
            archive: None,
        }
    }

    pub fn with_archive(mut self, archive: Arc<dyn ResumeArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Validates the batch, registers a task and starts its pipeline in the
    /// background. Returns without waiting on any remote call.
    pub async fn submit(
        &self,
        job_description: String,
        items: Vec<DocumentItem>,
    ) -> Result<Submission, AppError> {
        validate_batch(&job_description, &items)?;

        let task_id = Uuid::new_v4();
        let total_items = items.len();
        let estimate = self.scorer.estimate(total_items);
        let estimated_time = format_minutes(estimate);

        self.store
            .create(Task::new(task_id, total_items, estimated_time.clone()))
            .await?;
        info!("Task {task_id} registered with {total_items} documents");

        self.spawn_archive(task_id, &job_description, &items);
        self.spawn_pipeline(task_id, job_description, items);

        Ok(Submission {
            task_id,
            total_items,
            estimated_completion_secs: estimate.as_secs(),
            estimated_time,
            processing_rate: self.scorer.processing_rate(),
        })
    }

    pub async fn status(&self, task_id: Uuid) -> Result<TaskStatusView, AppError> {
        let task = self.store.get(task_id).await?;
        Ok(TaskStatusView::from(&task))
    }

    pub async fn results(&self, task_id: Uuid) -> Result<TaskResults, AppError> {
        let task = self.store.get(task_id).await?;
        match (task.status, task.results) {
            (TaskStatus::Completed, Some(results)) => Ok(TaskResults { task_id, results }),
            (status, _) => Err(AppError::ResultsNotReady(status)),
        }
    }

    pub async fn list(&self) -> Vec<Task> {
        self.store.list().await
    }

    pub async fn clear(&self) -> usize {
        let cleared = self.store.clear().await;
        info!("Cleared {cleared} tasks from the registry");
        cleared
    }

    /// Copies the batch to object storage on a detached task. The pipeline never
    /// waits on it, so a slow or unreachable bucket cannot hold a task back.
    fn spawn_archive(&self, task_id: Uuid, job_description: &str, items: &[DocumentItem]) {
        let Some(archive) = self.archive.clone() else {
            return;
        };
        let folder = folder_name(job_description, Utc::now());
        let items = items.to_vec();
        tokio::spawn(async move {
            let stored = archive_batch(archive.as_ref(), &folder, &items).await;
            info!(
                "Task {task_id}: archived {stored}/{} documents to {folder}",
                items.len()
            );
        });
    }

    /// Runs the pipeline in its own task so a panic cannot escape; the outer task
    /// turns any error or panic into a `failed` record.
    fn spawn_pipeline(
        &self,
        task_id: Uuid,
        job_description: String,
        items: Vec<DocumentItem>,
    ) {
        let this = self.clone();
        tokio::spawn(async move {
            let pipeline = this.clone();
            let outcome = tokio::spawn(async move {
                pipeline
                    .run_pipeline(task_id, &job_description, items)
                    .await
            })
            .await;

            let message = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e.to_string(),
                Err(join_err) if join_err.is_panic() => {
                    format!("Pipeline panicked: {}", panic_message(join_err.into_panic()))
                }
                Err(join_err) => format!("Pipeline aborted: {join_err}"),
            };

            error!("Task {task_id} failed: {message}");
            if let Err(e) = this
                .store
                .update(task_id, Box::new(move |task| task.fail(message)))
                .await
            {
                warn!("Could not record failure for task {task_id}: {e}");
            }
        });
    }

    async fn run_pipeline(
        &self,
        task_id: Uuid,
        job_description: &str,
        items: Vec<DocumentItem>,
    ) -> Result<(), PipelineError> {
        let total = items.len();

        // Stage 1: extract text
        self.advance(task_id, TaskStatus::ExtractingText, Vec::new())
            .await?;
        let mut extracted = Vec::with_capacity(total);
        for item in items {
            extracted.push(extract_item(self.extractor.as_ref(), item).await);
        }
        let (extracted, failures) = split_extracted(extracted);
        info!(
            "Task {task_id}: extracted {}/{total} documents",
            extracted.len()
        );
        if extracted.is_empty() {
            self.record_failures(task_id, failures.clone()).await?;
            return Err(PipelineError::NoTextExtracted {
                total,
                reasons: summarize(&failures),
            });
        }

        // Stage 2: parse resumes
        self.advance(task_id, TaskStatus::ParsingResumes, failures)
            .await?;
        let mut parsed = Vec::with_capacity(extracted.len());
        for item in &extracted {
            parsed.push(parse_item(self.parser.as_ref(), item).await);
        }
        let (parsed, failures) = split_parsed(parsed);
        info!(
            "Task {task_id}: parsed {}/{} resumes",
            parsed.len(),
            extracted.len()
        );
        if parsed.is_empty() {
            self.record_failures(task_id, failures.clone()).await?;
            return Err(PipelineError::NoResumesParsed {
                total: extracted.len(),
                reasons: summarize(&failures),
            });
        }
        drop(extracted);

        // Stage 3: score candidates
        self.advance(task_id, TaskStatus::ScoringCandidates, failures)
            .await?;
        let outcome = self.scorer.score_batch(job_description, &parsed).await;

        let processed = outcome.processed_count;
        self.store
            .update(
                task_id,
                Box::new(move |task| task.complete(processed, outcome.results)),
            )
            .await?;
        info!("Task {task_id} completed: {processed} candidates scored");
        Ok(())
    }

    /// Moves to `next` and records the previous stage's drop-outs in one update.
    async fn advance(
        &self,
        task_id: Uuid,
        next: TaskStatus,
        failures: Vec<ItemFailure>,
    ) -> Result<(), TaskError> {
        self.store
            .update(
                task_id,
                Box::new(move |task| {
                    task.advance(next)?;
                    failures.into_iter().for_each(|f| task.record_failure(f));
                    Ok(())
                }),
            )
            .await?;
        Ok(())
    }

    async fn record_failures(
        &self,
        task_id: Uuid,
        failures: Vec<ItemFailure>,
    ) -> Result<(), TaskError> {
        self.store
            .update(
                task_id,
                Box::new(move |task| {
                    failures.into_iter().for_each(|f| task.record_failure(f));
                    Ok(())
                }),
            )
            .await?;
        Ok(())
    }
}

fn validate_batch(job_description: &str, items: &[DocumentItem]) -> Result<(), AppError> {
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    if items.is_empty() {
        return Err(AppError::Validation("No files uploaded".to_string()));
    }

    let rejected: Vec<String> = items
        .iter()
        .filter_map(|item| {
            item.validate()
                .err()
                .map(|e| format!("{}: {e}", item.filename))
        })
        .collect();
    if rejected.len() == items.len() {
        return Err(AppError::Validation(format!(
            "No valid PDF files uploaded ({})",
            rejected.join("; ")
        )));
    }
    for reason in &rejected {
        warn!("Accepted batch contains an invalid document: {reason}");
    }
    Ok(())
}

fn split_extracted(results: Vec<ExtractionResult>) -> (Vec<ExtractionResult>, Vec<ItemFailure>) {
    let (ok, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.success);
    let failures = failed
        .into_iter()
        .map(|r| {
            warn!("Extraction failed for {}: {:?}", r.filename, r.error);
            ItemFailure {
                filename: r.filename,
                stage: FailureStage::Extraction,
                error: r.error.unwrap_or_else(|| "Text extraction failed".to_string()),
            }
        })
        .collect();
    (ok, failures)
}

fn split_parsed(records: Vec<ParsedRecord>) -> (Vec<ParsedRecord>, Vec<ItemFailure>) {
    let (ok, failed): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| r.success);
    let failures = failed
        .into_iter()
        .map(|r| {
            warn!("Parsing failed for {}: {:?}", r.filename, r.error);
            ItemFailure {
                filename: r.filename,
                stage: FailureStage::Parsing,
                error: r.error.unwrap_or_else(|| "Resume parsing failed".to_string()),
            }
        })
        .collect();
    (ok, failures)
}

fn summarize(failures: &[ItemFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.filename, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_minutes(duration: Duration) -> String {
    format!("{:.1} minutes", duration.as_secs_f64() / 60.0)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
