//! Error types for the SQLite backend.

use table_alter_core::BackendError;
use thiserror::Error;

/// Errors that can occur during SQLite catalog and DDL operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Schema-to-row or row-to-schema conversion failure.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Table prefix contains invalid characters.
    #[error("invalid prefix '{0}': must contain only alphanumeric characters and underscores")]
    InvalidPrefix(String),

    /// Catalog row references a table that does not exist.
    #[error("table not found in catalog: {0}")]
    TableNotFound(String),
}

impl From<SqliteError> for BackendError {
    fn from(err: SqliteError) -> Self {
        BackendError::new(err.to_string())
    }
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
