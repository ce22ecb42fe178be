//! Crate error types.

use thiserror::Error;

/// Errors raised by catalog, workspace and store operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Relationship '{0}' not found")]
    RelationshipNotFound(String),

    #[error("Memo '{0}' not found")]
    MemoNotFound(String),

    #[error("Column index {index} out of range for table '{table}'")]
    ColumnOutOfRange { table: String, index: usize },

    #[error("Corner index {0} out of range")]
    CornerOutOfRange(usize),

    #[error("A table must have at least one column")]
    NoColumns,

    /// Raised when deleting the last remaining column of a table.
    #[error("A table must keep at least one column")]
    LastColumn,

    #[error("A relationship already exists between these tables")]
    DuplicateRelationship,

    #[error("A relationship cannot reference its own table")]
    SelfReference,

    #[error("Name must not be empty")]
    EmptyName,

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
