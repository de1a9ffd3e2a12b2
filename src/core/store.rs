use std::collections::HashSet;

use chrono::Utc;
use thiserror::Error;

use crate::fs::storage::{Storage, StorageError};
use crate::models::{Comment, CommentId, Status, Task, TaskDraft, TaskId, ValidationError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("duplicate task id {0}")]
    DuplicateId(TaskId),
    #[error("task {id} is invalid: {source}")]
    InvalidTask {
        id: TaskId,
        #[source]
        source: ValidationError,
    },
    #[error("failed to persist tasks: {0}")]
    Persist(#[from] StorageError),
}

/// Timestamp-derived id that never collides with an existing one.
fn next_id(existing: impl Iterator<Item = i64>) -> i64 {
    let now = Utc::now().timestamp_millis();
    match existing.max() {
        Some(max) if max >= now => max + 1,
        _ => now,
    }
}

/// Give every repeated task id after the first occurrence a fresh one.
fn renumber_duplicates(mut tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    for index in 0..tasks.len() {
        let id = tasks[index].id;
        if seen.insert(id) {
            continue;
        }
        let fresh = next_id(tasks.iter().map(|t| t.id));
        tracing::warn!("task id {} appears twice, renumbering the later copy to {}", id, fresh);
        tasks[index].id = fresh;
        seen.insert(fresh);
    }
    tasks
}

/// The authoritative in-memory task collection.
///
/// Every successful mutation is written through to the storage slot before it
/// returns. A failed write rolls the in-memory change back, so memory and
/// storage never disagree.
pub struct TaskStore {
    tasks: Vec<Task>,
    storage: Box<dyn Storage>,
}

impl TaskStore {
    /// Load the collection from `storage`.
    pub fn open(storage: impl Storage + 'static) -> Self {
        let tasks = renumber_duplicates(storage.load());
        tracing::info!("loaded {} tasks", tasks.len());
        Self {
            tasks,
            storage: Box::new(storage),
        }
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Create a task in the todo column and return its id.
    pub fn create(&mut self, draft: TaskDraft) -> Result<TaskId, StoreError> {
        let fields = draft.validate()?;
        let id = next_id(self.tasks.iter().map(|t| t.id));

        self.write_through(|tasks| tasks.push(Task::new(id, fields)))?;

        tracing::info!("created task {}", id);
        Ok(id)
    }

    /// Overwrite title, description, priority, due date and image.
    pub fn update(&mut self, id: TaskId, draft: TaskDraft) -> Result<(), StoreError> {
        let index = self.index_of(id).ok_or(StoreError::NotFound(id))?;
        let fields = draft.validate()?;

        self.write_through(|tasks| tasks[index].apply(fields))?;

        tracing::info!("updated task {}", id);
        Ok(())
    }

    /// Move a task to another column.
    ///
    /// Returns `Ok(false)` without writing when the task is unknown or already
    /// has `status`.
    pub fn set_status(&mut self, id: TaskId, status: Status) -> Result<bool, StoreError> {
        let Some(index) = self.index_of(id) else {
            return Ok(false);
        };
        if self.tasks[index].status == status {
            return Ok(false);
        }

        self.write_through(|tasks| tasks[index].status = status)?;

        tracing::info!("moved task {} to {}", id, status);
        Ok(true)
    }

    /// Delete a task together with its comments. Returns `Ok(false)` if absent.
    pub fn remove(&mut self, id: TaskId) -> Result<bool, StoreError> {
        let Some(index) = self.index_of(id) else {
            return Ok(false);
        };

        self.write_through(|tasks| {
            tasks.remove(index);
        })?;

        tracing::info!("deleted task {}", id);
        Ok(true)
    }

    /// Append a comment to a task.
    pub fn add_comment(&mut self, id: TaskId, text: &str) -> Result<CommentId, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }
        let index = self.index_of(id).ok_or(StoreError::NotFound(id))?;
        let comment_id = next_id(self.tasks[index].comments.iter().map(|c| c.id));

        let comment = Comment {
            id: comment_id,
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.write_through(|tasks| tasks[index].comments.push(comment))?;

        tracing::debug!("added comment {} to task {}", comment_id, id);
        Ok(comment_id)
    }

    /// Replace the whole collection (import). Nothing changes unless every
    /// record is valid and every id is unique.
    pub fn replace_all(&mut self, tasks: Vec<Task>) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for task in &tasks {
            if !seen.insert(task.id) {
                return Err(StoreError::DuplicateId(task.id));
            }
            task.validate()
                .map_err(|source| StoreError::InvalidTask { id: task.id, source })?;
        }

        self.write_through(|current| *current = tasks)?;
        tracing::info!("replaced collection with {} tasks", self.tasks.len());
        Ok(())
    }

    fn index_of(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn write_through<T>(&mut self, mutate: impl FnOnce(&mut Vec<Task>) -> T) -> Result<T, StoreError> {
        let previous = self.tasks.clone();
        let out = mutate(&mut self.tasks);

        if let Err(e) = self.storage.save(&self.tasks) {
            tracing::error!("write failed, rolling back: {}", e);
            self.tasks = previous;
            return Err(e.into());
        }

        Ok(out)
    }
}
