//! Ingestion error types

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Source file missing, locked or unreadable
    #[error("{message}")]
    SourceRead {
        /// Source path
        path: String,
        /// Operator-facing description
        message: String,
    },

    /// Source file content cannot be read as a table
    #[error("malformed source '{path}': {message}")]
    SourceFormat {
        /// Source path
        path: String,
        /// Parser message
        message: String,
    },

    /// Column override names a field the record kind does not have
    #[error("unknown field '{field}' for record kind '{kind}'")]
    UnknownField {
        /// Record kind key
        kind: String,
        /// Field name
        field: String,
    },

    /// Column binding with an empty column name
    #[error("empty column name for field '{field}' of record kind '{kind}'")]
    EmptyColumn {
        /// Record kind key
        kind: String,
        /// Field name
        field: String,
    },
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
