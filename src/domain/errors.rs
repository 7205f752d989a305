//! Domain errors for the tether repository and store layers.

use thiserror::Error;

/// Failure to map a single record to or from its document form.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode record: {0}")]
    Serialize(String),

    #[error("Failed to decode record: {0}")]
    Deserialize(String),

    #[error("Record did not encode to a document, got {0}")]
    NotADocument(&'static str),

    #[error("Post-process hook rejected record: {0}")]
    PostProcess(String),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Errors surfaced by document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Document store query failed: {0}")]
    Query(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Background store task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// True when the failure came from reaching the store rather than from a record.
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// True when only one record is affected and the rest of a multi-record
    /// read can still be trusted. Everything else fails the whole read.
    pub fn is_record_level(&self) -> bool {
        matches!(self, StoreError::Codec(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Deserialize(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}
