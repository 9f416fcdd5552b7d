//! Error types for the entity model layer.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while materializing or diffing entity snapshots.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A field lookup matched neither a direct key nor a group-suffixed key.
    #[error("field not found: {entity}.{field}")]
    FieldNotFound { entity: String, field: String },

    /// A field named in a patch request exists in neither snapshot.
    #[error("unrecognized field in patch request: {entity}.{field}")]
    UnknownField { entity: String, field: String },

    /// A mapping-only operation was called on a list-shaped store.
    #[error("operation `{operation}` is not supported on a list-shaped store")]
    ListShaped { operation: &'static str },

    /// An add/replace targeted a grouped custom field as a whole.
    #[error("grouped custom field {entity}.{field}: {operation} requires a group index")]
    GroupedWrite {
        entity: String,
        field: String,
        operation: &'static str,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
