//! Projection error types.

use thiserror::Error;

use crate::dao::DaoError;

/// Errors raised while projecting change-stream records.
///
/// Any of these aborts the batch with an error, which signals the invoking
/// consumer to redeliver it.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The payload attribute did not hold valid base64.
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded payload was not UTF-8 text.
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The payload text did not decode into a domain event.
    #[error("event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A read-store write failed.
    #[error("read store write failed: {0}")]
    Dao(#[from] DaoError),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
