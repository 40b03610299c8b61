use thiserror::Error;

use crate::Version;

/// Errors raised by the event-log collaborator.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The expected version did not match the stored version; another
    /// writer persisted first.
    #[error(
        "optimistic lock conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    OptimisticLock {
        aggregate_id: String,
        expected: Version,
        actual: Version,
    },

    /// Any other backend failure.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EventStoreError {
    /// Wraps an arbitrary backend failure.
    pub fn storage(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage(cause.into())
    }

    /// True when this error is an optimistic-lock conflict. The repository
    /// layer relies on this to keep conflicts distinguishable from generic
    /// I/O failures.
    pub fn is_optimistic_lock(&self) -> bool {
        matches!(self, Self::OptimisticLock { .. })
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
