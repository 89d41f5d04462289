//! Persistence error type

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing or reading durable run state
///
/// Any of these aborts the run: losing track of a record's outcome is worse
/// than stopping.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        source: serde_json::Error,
    },

    #[error("Corrupt state file {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

impl PersistError {
    /// Builds a closure mapping an IO error onto `path`
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError {
        let path = path.to_path_buf();
        move |source| PersistError::Io { path, source }
    }
}

/// Result type for persistence operations
pub type PersistResult<T> = Result<T, PersistError>;
