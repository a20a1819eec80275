//! Stateless chain-admission checks.
//!
//! These two functions are the only place where equivocation or tampering
//! in a directory's own chain is caught. Everything that admits snapshots
//! goes through them.

use vouch_types::Digest;

use crate::error::ChainError;
use crate::snapshot::{PublicKey, Snapshot};

/// Check that `candidate` can start a history pinned to `key`.
pub fn verify_initial(key: &PublicKey, candidate: &Snapshot) -> Result<(), ChainError> {
    if candidate.epoch != 0 {
        return Err(ChainError::MalformedInitialState {
            epoch: candidate.epoch,
            reason: "first snapshot must be epoch 0",
        });
    }

    if candidate.prev_snapshot_hash != Digest::ZERO {
        return Err(ChainError::MalformedInitialState {
            epoch: 0,
            reason: "epoch-0 back-link must be the zero digest",
        });
    }

    key.to_verifying_key()?;

    if !candidate.verify_signature(key) {
        return Err(ChainError::InvalidSignature { epoch: 0 });
    }

    Ok(())
}

/// Check that `candidate` directly extends the verified snapshot `prev`.
pub fn verify_link(key: &PublicKey, prev: &Snapshot, candidate: &Snapshot) -> Result<(), ChainError> {
    if prev.epoch.checked_add(1) != Some(candidate.epoch) {
        return Err(ChainError::EpochGap {
            expected: prev.epoch.saturating_add(1),
            got: candidate.epoch,
        });
    }

    if candidate.prev_snapshot_hash != prev.digest() {
        return Err(ChainError::BrokenLink {
            epoch: candidate.epoch,
        });
    }

    key.to_verifying_key()?;

    if !candidate.verify_signature(key) {
        return Err(ChainError::InvalidSignature {
            epoch: candidate.epoch,
        });
    }

    Ok(())
}
