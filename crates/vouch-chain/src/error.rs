//! Error types for chain admission.

use vouch_types::{Epoch, StatusCode};

/// Reasons a snapshot is refused admission to a chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The first snapshot of a history is not a valid epoch-0 snapshot.
    #[error("malformed initial state at epoch {epoch}: {reason}")]
    MalformedInitialState {
        /// Epoch of the rejected snapshot.
        epoch: Epoch,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// The candidate does not directly follow the latest verified epoch.
    #[error("epoch gap: expected {expected}, got {got}")]
    EpochGap {
        /// The only epoch that could have been admitted.
        expected: Epoch,
        /// The epoch that was offered.
        got: Epoch,
    },

    /// `prev_snapshot_hash` does not match the digest of the verified predecessor.
    #[error("broken hash link at epoch {epoch}")]
    BrokenLink {
        /// Epoch of the snapshot whose back-link is wrong.
        epoch: Epoch,
    },

    /// The snapshot signature does not verify under the pinned key.
    #[error("invalid signature at epoch {epoch}")]
    InvalidSignature {
        /// Epoch of the badly signed snapshot.
        epoch: Epoch,
    },

    /// The pinned public key bytes are not a valid ed25519 point.
    #[error("invalid directory public key")]
    InvalidKey,
}

impl ChainError {
    /// Outward status code for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            ChainError::MalformedInitialState { .. } | ChainError::InvalidKey => {
                StatusCode::MalformedMessage
            }
            ChainError::EpochGap { .. }
            | ChainError::BrokenLink { .. }
            | ChainError::InvalidSignature { .. } => StatusCode::InvalidChain,
        }
    }
}
