//! Error types for the remote access layer.

use lendbase_model::ModelError;
use thiserror::Error;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the platform.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transient upstream failures persisted through every allowed attempt.
    ///
    /// For mutating calls this outcome is ambiguous: the platform does not
    /// deduplicate repeated writes, so the last attempt may or may not have
    /// been applied. Callers needing at-most-once semantics must reconcile
    /// before retrying.
    #[error("communication failure after {attempts} attempts: {reason}")]
    Communication { attempts: u32, reason: String },

    /// The response body could not be parsed as the expected wire format.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The caller passed a disallowed filter, sort field or parameter.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server accepted the request but reported a domain failure.
    #[error("business error {code}: {reason}")]
    Business { code: String, reason: String },

    /// The entity type does not declare the requested capability.
    #[error("entity type {entity} does not support {operation}")]
    Unsupported {
        entity: &'static str,
        operation: &'static str,
    },

    /// The caller-supplied deadline elapsed before the operation finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error from the entity model layer.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// True for failures that exhausted every allowed attempt.
    pub fn is_communication(&self) -> bool {
        matches!(self, ApiError::Communication { .. })
    }

    /// True for errors caused by the caller rather than the platform.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ApiError::Validation(_) | ApiError::Unsupported { .. } | ApiError::Model(_)
        )
    }
}
