//! Error types for message validation.

use vouch_types::StatusCode;

/// Reasons a response cannot be processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtoError {
    /// The peer reported a failure status.
    #[error("peer returned status: {0}")]
    Status(StatusCode),

    /// The response is structurally invalid.
    #[error("malformed message: {0}")]
    Malformed(&'static str),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProtoError {
    /// Outward status code for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            ProtoError::Status(code) => *code,
            ProtoError::Malformed(_) | ProtoError::Serialization(_) => StatusCode::MalformedMessage,
        }
    }
}

impl From<postcard::Error> for ProtoError {
    fn from(e: postcard::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
