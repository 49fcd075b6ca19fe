//! Error types for the cutting core.

use thiserror::Error;

use crate::session::CommitSummary;

/// Stable classification of core errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Caller-side precondition violation.
    InvalidInput,
    /// The record service refused the write.
    Validation,
    /// Referenced entity does not exist.
    NotFound,
    /// Transport failure.
    Network,
    /// Record service answered with a 5xx status.
    Server,
    /// Commit attempted with open per-roll validation errors.
    SessionInvalid,
    /// Bulk-import header is missing required columns.
    Header,
    /// Commit finished with some per-roll patches failed.
    PartialCommit,
    /// Session action not allowed in the current state.
    IllegalTransition,
}

/// Main error type for the core.
#[derive(Debug, Error)]
pub enum TelasError {
    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Cut cannot be committed: {}", .reasons.join("; "))]
    SessionInvalid { reasons: Vec<String> },

    #[error("Import header is missing required columns: {}", .missing.join(", "))]
    Header { missing: Vec<String> },

    #[error(
        "Commit partially applied: {} of {} rolls updated",
        .summary.ok_count(),
        .summary.outcomes.len()
    )]
    PartialCommit { summary: CommitSummary },

    #[error("Cannot {action} while session is {state}")]
    IllegalTransition {
        state: &'static str,
        action: &'static str,
    },
}

impl TelasError {
    /// Shorthand for an [`TelasError::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        TelasError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get the classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            TelasError::InvalidInput { .. } => ErrorCode::InvalidInput,
            TelasError::Validation { .. } => ErrorCode::Validation,
            TelasError::NotFound { .. } => ErrorCode::NotFound,
            TelasError::Network { .. } => ErrorCode::Network,
            TelasError::Server { .. } => ErrorCode::Server,
            TelasError::SessionInvalid { .. } => ErrorCode::SessionInvalid,
            TelasError::Header { .. } => ErrorCode::Header,
            TelasError::PartialCommit { .. } => ErrorCode::PartialCommit,
            TelasError::IllegalTransition { .. } => ErrorCode::IllegalTransition,
        }
    }

    /// Whether a retry of the same call may succeed.
    ///
    /// The core never retries on its own; callers decide.
    pub fn is_transient(&self) -> bool {
        matches!(self, TelasError::Network { .. } | TelasError::Server { .. })
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, TelasError>;
