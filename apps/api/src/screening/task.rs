//! Task model: one batch submission's end-to-end processing record.
//!
//! Status changes go through [`Task::advance`], [`Task::complete`] and [`Task::fail`],
//! which reject any transition that would move the pipeline backward or reopen a
//! terminal task.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::screening::scorer::CandidateResult;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task {0} not found")]
    NotFound(Uuid),

    #[error("Task {0} already exists")]
    AlreadyExists(Uuid),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("processed_count {processed} exceeds total_items {total}")]
    CountOverflow { processed: usize, total: usize },
}

/// Pipeline stage of a task. Serialized snake_case for the status API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Processing,
    ExtractingText,
    ParsingResumes,
    ScoringCandidates,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Processing => "processing",
            TaskStatus::ExtractingText => "extracting_text",
            TaskStatus::ParsingResumes => "parsing_resumes",
            TaskStatus::ScoringCandidates => "scoring_candidates",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    fn position(&self) -> u8 {
        match self {
            TaskStatus::Processing => 0,
            TaskStatus::ExtractingText => 1,
            TaskStatus::ParsingResumes => 2,
            TaskStatus::ScoringCandidates => 3,
            TaskStatus::Completed | TaskStatus::Failed => 4,
        }
    }

    /// Forward-only along the stage sequence. `Failed` is reachable from any
    /// non-terminal stage; `Completed` only from `ScoringCandidates`.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            TaskStatus::Failed => true,
            TaskStatus::Completed => *self == TaskStatus::ScoringCandidates,
            _ => next.position() > self.position(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage at which an individual document was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Extraction,
    Parsing,
}

/// A document that did not survive a stage. The task itself may still complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub filename: String,
    pub stage: FailureStage,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub status: TaskStatus,
    pub total_items: usize,
    pub processed_count: usize,
    pub estimated_time: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub results: Option<Vec<CandidateResult>>,
    pub item_failures: Vec<ItemFailure>,
}

impl Task {
    pub fn new(id: Uuid, total_items: usize, estimated_time: String) -> Self {
        Self {
            id,
            status: TaskStatus::Processing,
            total_items,
            processed_count: 0,
            estimated_time,
            started_at: Utc::now(),
            completed_at: None,
            failed_at: None,
            error: None,
            results: None,
            item_failures: Vec::new(),
        }
    }

    /// Moves a running task to the next pipeline stage.
    pub fn advance(&mut self, next: TaskStatus) -> Result<(), TaskError> {
        if next.is_terminal() {
            return Err(self.invalid(next));
        }
        self.transition(next)
    }

    pub fn record_failure(&mut self, failure: ItemFailure) {
        self.item_failures.push(failure);
    }

    pub fn complete(
        &mut self,
        processed_count: usize,
        results: Vec<CandidateResult>,
    ) -> Result<(), TaskError> {
        if processed_count > self.total_items {
            return Err(TaskError::CountOverflow {
                processed: processed_count,
                total: self.total_items,
            });
        }
        self.transition(TaskStatus::Completed)?;
        // processed_count never decreases
        self.processed_count = self.processed_count.max(processed_count);
        self.results = Some(results);
        self.error = None;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TaskError> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(message.into());
        self.results = None;
        self.failed_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, next: TaskStatus) -> Result<(), TaskError> {
        if !self.status.can_transition_to(next) {
            return Err(self.invalid(next));
        }
        self.status = next;
        Ok(())
    }

    fn invalid(&self, next: TaskStatus) -> TaskError {
        TaskError::InvalidTransition {
            from: self.status,
            to: next,
        }
    }
}

/// Status view returned by the status API. Never carries full results.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusView {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub total_files: usize,
    pub processed: usize,
    pub estimated_time: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub item_failures: Vec<ItemFailure>,
}

impl From<&Task> for TaskStatusView {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id,
            status: task.status,
            total_files: task.total_items,
            processed: task.processed_count,
            estimated_time: task.estimated_time.clone(),
            started_at: task.started_at,
            completed_at: task.completed_at,
            failed_at: task.failed_at,
            error: task.error.clone(),
            item_failures: task.item_failures.clone(),
        }
    }
}
