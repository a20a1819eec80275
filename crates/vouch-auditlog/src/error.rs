//! Error types for the audit log.

use vouch_chain::ChainError;
use vouch_proto::ProtoError;
use vouch_types::{DirectoryId, StatusCode};

/// Errors returned by [`AuditLog`](crate::AuditLog) operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditLogError {
    /// Bad request shape or an out-of-bounds range.
    #[error("malformed message: {0}")]
    Malformed(&'static str),

    /// No history is known for this directory.
    #[error("unknown directory: {0}")]
    UnknownDirectory(DirectoryId),

    /// A history for this directory already exists.
    #[error("directory already exists: {0}")]
    AlreadyExists(DirectoryId),

    /// A snapshot failed chain admission.
    #[error("chain admission failed: {0}")]
    Chain(#[from] ChainError),

    /// An ingested response was unusable.
    #[error("invalid response: {0}")]
    Proto(#[from] ProtoError),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl AuditLogError {
    /// Outward status code for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            AuditLogError::Malformed(_) => StatusCode::MalformedMessage,
            AuditLogError::UnknownDirectory(_) => StatusCode::UnknownDirectory,
            AuditLogError::AlreadyExists(_) => StatusCode::AlreadyExists,
            AuditLogError::Chain(e) => e.status(),
            AuditLogError::Proto(e) => e.status(),
            AuditLogError::Storage(_) | AuditLogError::Serialization(_) => StatusCode::Internal,
        }
    }
}

impl From<postcard::Error> for AuditLogError {
    fn from(e: postcard::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
