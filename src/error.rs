//! Error types for teamtask
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task/user/notification)
//! - 3: Rejected by validation (dependency cycle, malformed suggestion)
//! - 4: Operation failed (store I/O, suggestion provider failure)

use std::path::PathBuf;
use thiserror::Error;

use crate::suggest::ValidationIssue;

/// Exit codes for the teamtask CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const VALIDATION_FAILED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for teamtask operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Notification not found: {0}")]
    NotificationNotFound(String),

    #[error("{collection} record not found: {id}")]
    NotFound { collection: &'static str, id: String },

    // Validation rejections (exit code 3)
    #[error("Dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("Suggestion rejected: {} validation issue(s)", .0.len())]
    SuggestionInvalid(Vec<ValidationIssue>),

    // Operation failures (exit code 4)
    #[error("Suggestion unavailable: {detail}")]
    SuggestionUnavailable { detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_)
            | Error::UserNotFound(_)
            | Error::NotificationNotFound(_)
            | Error::NotFound { .. } => exit_codes::USER_ERROR,

            // Validation rejections
            Error::DependencyCycle(_) | Error::SuggestionInvalid(_) => {
                exit_codes::VALIDATION_FAILED
            }

            // Operation failures
            Error::SuggestionUnavailable { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::StoreUnavailable(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for the JSON error envelope, if the error carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::DependencyCycle(path) => Some(serde_json::json!({ "cycle": path })),
            Error::SuggestionInvalid(issues) => {
                let issues: Vec<String> = issues.iter().map(|issue| issue.to_string()).collect();
                Some(serde_json::json!({ "issues": issues }))
            }
            Error::SuggestionUnavailable { detail } => {
                Some(serde_json::json!({ "detail": detail }))
            }
            _ => None,
        }
    }
}

/// Result type alias for teamtask operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
