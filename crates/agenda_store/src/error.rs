//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document not found.
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// The access rules rejected the request.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored document does not have the expected shape.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A submitted date could not be parsed.
    #[error(transparent)]
    InvalidDate(#[from] entities::DateParseError),
}

impl StoreError {
    /// Creates a not found error.
    pub fn not_found(collection: &str, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.into(),
        }
    }

    /// Creates a permission denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
