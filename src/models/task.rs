use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::status::{Priority, Status};

pub type TaskId = i64;
pub type CommentId = i64;

/// Titles longer than this are rejected by the form.
pub const MAX_TITLE_LEN: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    pub due_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Task {
    /// A fresh task always starts in the todo column with no comments.
    pub fn new(id: TaskId, fields: TaskFields) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            priority: fields.priority,
            due_date: fields.due_date,
            image: fields.image,
            status: Status::Todo,
            comments: Vec::new(),
        }
    }

    /// Overwrite the form-editable fields; status and comments stay as they are.
    pub fn apply(&mut self, fields: TaskFields) {
        self.title = fields.title;
        self.description = fields.description;
        self.priority = fields.priority;
        self.due_date = fields.due_date;
        self.image = fields.image;
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today && self.status != Status::Done
    }

    /// Check a record that did not come through the form, e.g. an imported one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TitleTooLong);
        }

        let mut seen = HashSet::new();
        for comment in &self.comments {
            if comment.text.trim().is_empty() {
                return Err(ValidationError::EmptyComment);
            }
            if !seen.insert(comment.id) {
                return Err(ValidationError::DuplicateCommentId(comment.id));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,
    #[error("Title must be at most 120 characters")]
    TitleTooLong,
    #[error("Priority is required")]
    MissingPriority,
    #[error("Due date is required")]
    MissingDueDate,
    #[error("Comment cannot be empty")]
    EmptyComment,
    #[error("Duplicate comment id {0}")]
    DuplicateCommentId(CommentId),
}

/// Raw form input for creating or editing a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub image: Option<String>,
}

/// A draft that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub image: Option<String>,
}

impl TaskDraft {
    pub fn validate(self) -> Result<TaskFields, ValidationError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TitleTooLong);
        }
        let priority = self.priority.ok_or(ValidationError::MissingPriority)?;
        let due_date = self.due_date.ok_or(ValidationError::MissingDueDate)?;

        Ok(TaskFields {
            title,
            description: self.description,
            priority,
            due_date,
            image: self.image,
        })
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: Some(task.priority),
            due_date: Some(task.due_date),
            image: task.image.clone(),
        }
    }
}
