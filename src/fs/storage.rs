use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::Task;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single slot holding the whole task collection as one JSON blob.
pub trait Storage: Send {
    /// Serialize the entire collection and overwrite the slot.
    fn save(&mut self, tasks: &[Task]) -> Result<(), StorageError>;

    /// Read the slot. Missing or unparsable content yields an empty collection.
    fn load(&self) -> Vec<Task>;
}

/// Parse a stored blob, falling back to an empty collection
fn parse_blob(content: &str, origin: &str) -> Vec<Task> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<Task>>(content) {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::warn!("ignoring unreadable task data in {}: {}", origin, e);
            Vec::new()
        }
    }
}

/// Task collection stored in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Storage for JsonFileStorage {
    fn save(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        let json = serde_json::to_string(tasks)?;

        // 确保目录存在
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        fs::write(&self.path, json).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!("saved {} tasks to {}", tasks.len(), self.path.display());
        Ok(())
    }

    fn load(&self) -> Vec<Task> {
        if !self.path.exists() {
            return Vec::new();
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => parse_blob(&content, &self.path.display().to_string()),
            Err(e) => {
                tracing::warn!("cannot read {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }
}

/// Parse an exported blob strictly (used by import, where bad input is an error).
pub fn parse_export(content: &str) -> Result<Vec<Task>, serde_json::Error> {
    serde_json::from_str(content)
}

#[cfg(test)]
pub use memory::MemoryStorage;
