//! Error types for todocal
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (rejected input, unknown task, bad config)
//! - 4: Operation failed (save failed, I/O, lock contention, write in progress)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the todocal CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for todocal operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("{0}")]
    Validation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Operation failures (exit code 4)
    #[error("Save failed for {}: {source}", path.display())]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("A save is already in progress; try again once it completes")]
    WriteInProgress,

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_)
            | Error::InvalidConfig(_) => exit_codes::USER_ERROR,

            Error::SaveFailed { .. }
            | Error::WriteInProgress
            | Error::LockFailed(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Stable machine-readable category.
    ///
    /// Lets a presentation layer tell "input rejected" apart from
    /// "save failed, your change may not be durable".
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::TaskNotFound(_) => "not_found",
            Error::InvalidConfig(_) => "config",
            Error::WriteInProgress => "busy",
            Error::SaveFailed { .. }
            | Error::LockFailed(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::OperationFailed(_) => "persistence",
        }
    }

    /// True for storage and I/O failures.
    pub fn is_persistence(&self) -> bool {
        self.kind() == "persistence"
    }

    /// True when a mutation was applied in memory but may not have reached
    /// disk.
    pub fn may_lose_change(&self) -> bool {
        matches!(self, Error::SaveFailed { .. } | Error::LockFailed(_))
    }

    pub(crate) fn save_failed(path: impl Into<PathBuf>, source: Error) -> Self {
        Error::SaveFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias for todocal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        let details = match err {
            Error::SaveFailed { path, source } => Some(serde_json::json!({
                "path": path.display().to_string(),
                "cause": source.to_string(),
            })),
            Error::TaskNotFound(id) => Some(serde_json::json!({ "id": id })),
            _ => None,
        };
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details,
        }
    }
}
