//! Error types for the journalclub core
//!
//! Provides:
//! - Distinct error types for the failure modes of ingestion and engagement
//! - Machine-readable error codes
//! - A retryability marker for transient storage failures

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,

    // Resource errors (4xxx)
    NotFound,
    PaperNotFound,

    // Conflict errors (5xxx)
    Conflict,
    DuplicatePaper,

    // Listing parse errors (6xxx)
    MalformedEntry,

    // Storage errors (7xxx)
    TransientStorage,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::PaperNotFound => 4002,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,
            ErrorCode::DuplicatePaper => 5002,

            // Listing parsing (6xxx)
            ErrorCode::MalformedEntry => 6001,

            // Storage (7xxx)
            ErrorCode::TransientStorage => 7001,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Paper not found: {paper_id}")]
    PaperNotFound { paper_id: String },

    // Conflict errors
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Paper already exists: {paper_id}")]
    DuplicatePaper { paper_id: String },

    // Listing parse errors
    #[error("Listing entry could not be parsed: {message}")]
    MalformedEntry { message: String },

    // Storage errors (transaction could not commit; the caller may retry)
    #[error("Storage error: {0}")]
    Storage(#[from] sea_orm::DbErr),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::Conflict { .. } => ErrorCode::Conflict,
            AppError::DuplicatePaper { .. } => ErrorCode::DuplicatePaper,
            AppError::MalformedEntry { .. } => ErrorCode::MalformedEntry,
            AppError::Storage(_) => ErrorCode::TransientStorage,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the caller may retry the whole operation.
    ///
    /// Only transient storage failures are retry-eligible; validation and
    /// conflict errors are deterministic and will fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }

    /// Whether this error reflects a rejected request rather than a fault
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::MissingField { .. }
                | AppError::NotFound { .. }
                | AppError::PaperNotFound { .. }
                | AppError::Conflict { .. }
                | AppError::DuplicatePaper { .. }
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::PaperNotFound {
            paper_id: "2401.00001".into(),
        };
        assert_eq!(err.code(), ErrorCode::PaperNotFound);
        assert_eq!(err.code().as_code(), 4002);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_conflict_is_rejection() {
        let err = AppError::Conflict {
            message: "existing presenter".into(),
        };
        assert!(err.is_rejection());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_storage_error_is_retryable() {
        let err = AppError::Storage(sea_orm::DbErr::Custom("deadlock".into()));
        assert_eq!(err.code(), ErrorCode::TransientStorage);
        assert!(err.is_retryable());
        assert!(!err.is_rejection());
    }
}
