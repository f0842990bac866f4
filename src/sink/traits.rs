//! Sink trait and error types

use crate::crawler::ProductRecord;
use thiserror::Error;

/// Errors that can occur while storing records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Destination for extracted product records
///
/// Implementations must be shareable across worker tasks; a failed `store`
/// only affects the record being stored.
pub trait RecordSink: Send + Sync {
    fn store(&self, record: &ProductRecord) -> SinkResult<()>;
}
