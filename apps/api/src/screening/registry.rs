//! Task Registry: the only shared mutable state in the service.
//!
//! The orchestrator holds an `Arc<dyn TaskStore>`; the in-memory
//! backend can be swapped for a durable one without touching the pipeline.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::screening::task::{Task, TaskError};

/// Mutation applied to a single task record. Returning `Err` discards the change.
pub type TaskMutator = Box<dyn FnOnce(&mut Task) -> Result<(), TaskError> + Send>;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, task: Task) -> Result<(), TaskError>;

    /// Applies `mutator` atomically and returns the updated task.
    async fn update(&self, id: Uuid, mutator: TaskMutator) -> Result<Task, TaskError>;

    async fn get(&self, id: Uuid) -> Result<Task, TaskError>;

    async fn list(&self) -> Vec<Task>;

    /// Removes every task, returning how many were dropped.
    async fn clear(&self) -> usize;
}

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: Task) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(TaskError::AlreadyExists(task.id));
        }
        tasks.insert(task.id, task);
        Ok(())
    }

    async fn update(&self, id: Uuid, mutator: TaskMutator) -> Result<Task, TaskError> {
        let mut tasks = self.tasks.write().await;
        let current = tasks.get_mut(&id).ok_or(TaskError::NotFound(id))?;

        // Mutate a copy so a rejected transition leaves the stored record untouched.
        let mut draft = current.clone();
        mutator(&mut draft)?;
        *current = draft.clone();
        Ok(draft)
    }

    async fn get(&self, id: Uuid) -> Result<Task, TaskError> {
        self.tasks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(TaskError::NotFound(id))
    }

    async fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by_key(|t| t.started_at);
        tasks
    }

    async fn clear(&self) -> usize {
        let mut tasks = self.tasks.write().await;
        let count = tasks.len();
        tasks.clear();
        count
    }
}
