//! Error types for Stowage.

use thiserror::Error;

/// Common error type for Stowage.
#[derive(Error, Debug)]
pub enum StowageError {
    /// Referenced folder, file, parent or blob does not exist or is not owned
    /// by the caller. Both cases are reported identically.
    #[error("{0} not found")]
    NotFound(String),

    /// Uniqueness or emptiness rule violated (duplicate folder name,
    /// duplicate email, non-empty folder).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid user input (empty upload, bad name, bad paging parameters).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Upload content exceeds the size limit (in bytes).
    #[error("content exceeds the {0} byte limit")]
    TooLarge(u64),

    /// Blob store failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Database error.
    ///
    /// Errors from sqlx that are not constraint violations end up here.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for StowageError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return StowageError::Conflict(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return StowageError::Conflict(db_err.message().to_string());
            }
        }
        match e {
            sqlx::Error::RowNotFound => StowageError::NotFound("row".to_string()),
            other => StowageError::Database(other.to_string()),
        }
    }
}

/// Result type alias for Stowage operations.
pub type Result<T> = std::result::Result<T, StowageError>;
