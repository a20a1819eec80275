//! Error types for the consistency checker.

use vouch_chain::ChainError;
use vouch_proto::{ProofError, ProtoError};
use vouch_types::{Epoch, StatusCode};

/// Errors returned by [`ConsistencyChecker`](crate::ConsistencyChecker).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    /// No epoch-0 snapshot has been pinned yet.
    #[error("checker is not initialized")]
    Uninitialized,

    /// `init` was called on a checker that already tracks a directory.
    #[error("checker is already initialized")]
    AlreadyInitialized,

    /// A previous chain fault made this checker's view of the directory
    /// untrustworthy.
    #[error("checker is faulted")]
    Faulted,

    /// A snapshot failed chain admission or range verification.
    #[error("chain verification failed: {0}")]
    Chain(#[from] ChainError),

    /// The response could not be used.
    #[error("invalid response: {0}")]
    Proto(#[from] ProtoError),

    /// Two different snapshots were presented for the same epoch.
    #[error("equivocation detected at epoch {epoch}")]
    Equivocation { epoch: Epoch },

    /// The authenticated-mapping proof did not verify.
    #[error(transparent)]
    Proof(#[from] ProofError),

    /// A registration promise was missing or invalid.
    #[error("invalid registration promise: {0}")]
    InvalidPromise(&'static str),

    /// The value bound to `name` differs from the expected one.
    #[error("value mismatch for {name}")]
    KeyMismatch { name: String },
}

impl CheckError {
    /// Outward status code for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            CheckError::Uninitialized => StatusCode::UnknownDirectory,
            CheckError::AlreadyInitialized => StatusCode::AlreadyExists,
            CheckError::Faulted => StatusCode::InvalidChain,
            CheckError::Chain(e) => e.status(),
            CheckError::Proto(e) => e.status(),
            CheckError::Equivocation { .. } => StatusCode::EquivocationDetected,
            CheckError::Proof(_) | CheckError::InvalidPromise(_) => {
                StatusCode::ProofVerificationFailed
            }
            CheckError::KeyMismatch { .. } => StatusCode::KeyMismatch,
        }
    }
}
