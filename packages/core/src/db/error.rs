//! Store Error Types
//!
//! Errors surfaced by entity store backends. These are the "transport or
//! storage failure" class: they propagate to the caller unchanged and the
//! core never retries them.

use std::path::PathBuf;
use thiserror::Error;

/// Entity store operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not be reached or refused the operation
    #[error("Store unavailable: {context}")]
    Unavailable { context: String },

    /// A patch in a batch referenced an entity that does not exist.
    /// The whole batch is discarded.
    #[error("Batch rejected: {collection} entity '{id}' does not exist")]
    MissingEntity {
        collection: &'static str,
        id: String,
    },

    /// Stored value could not be encoded or decoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to establish database connection
    #[cfg(feature = "turso")]
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Invalid database path provided
    #[error("Invalid database path: {path}")]
    InvalidPath { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[cfg(feature = "turso")]
    #[error("Database operation failed: {0}")]
    Libsql(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecution { context: String },
}

impl StoreError {
    pub fn unavailable(context: impl Into<String>) -> Self {
        Self::Unavailable {
            context: context.into(),
        }
    }

    pub fn missing_entity(collection: &'static str, id: impl Into<String>) -> Self {
        Self::MissingEntity {
            collection,
            id: id.into(),
        }
    }

    pub fn invalid_path(path: PathBuf) -> Self {
        Self::InvalidPath { path }
    }

    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecution {
            context: context.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
