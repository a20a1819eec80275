//! Per-(observer, directory) verification state.

use tracing::debug;
use vouch_types::Epoch;

use crate::error::ChainError;
use crate::snapshot::{PublicKey, Snapshot};
use crate::verifier::{verify_initial, verify_link};

type Result<T> = std::result::Result<T, ChainError>;

/// Latest verified snapshot of one directory plus its pinned key.
///
/// Created from an accepted epoch-0 snapshot (trust on first use), then
/// mutated only by successful chain extension. Never rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditState {
    pinned_key: PublicKey,
    latest: Snapshot,
}

impl AuditState {
    /// Pin `key` and accept `initial` as the start of the chain.
    pub fn pin(key: PublicKey, initial: Snapshot) -> Result<Self> {
        verify_initial(&key, &initial)?;

        debug!(directory = %initial.directory_id(), key = %key, "pinned directory key");

        Ok(Self {
            pinned_key: key,
            latest: initial,
        })
    }

    /// The key captured at first contact.
    pub fn pinned_key(&self) -> &PublicKey {
        &self.pinned_key
    }

    /// The highest-epoch snapshot successfully chained.
    pub fn latest(&self) -> &Snapshot {
        &self.latest
    }

    /// Epoch of [`AuditState::latest`].
    pub fn epoch(&self) -> Epoch {
        self.latest.epoch
    }

    /// Admit a single snapshot.
    pub fn admit(&mut self, candidate: &Snapshot) -> Result<()> {
        self.admit_range(std::slice::from_ref(candidate)).map(|_| ())
    }

    /// Check that `range` would extend this state, without committing it.
    pub fn verify_range(&self, range: &[Snapshot]) -> Result<()> {
        let mut cursor = &self.latest;

        for candidate in range {
            verify_link(&self.pinned_key, cursor, candidate)?;
            cursor = candidate;
        }

        Ok(())
    }

    /// Admit a contiguous run of snapshots, all or nothing.
    ///
    /// Validates sequentially from the first candidate. If any fails, the
    /// state is left at its previous `latest`. Returns the number admitted.
    pub fn admit_range(&mut self, range: &[Snapshot]) -> Result<usize> {
        self.verify_range(range)?;

        if let Some(last) = range.last() {
            self.latest = last.clone();
            debug!(epoch = last.epoch, admitted = range.len(), "admitted snapshots");
        }

        Ok(range.len())
    }
}
