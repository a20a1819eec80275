//! One directory's verified snapshot history.

use vouch_chain::{AuditState, ChainError, PublicKey, Snapshot};
use vouch_types::Epoch;

/// A directory's address, pinned key, and gap-free admitted snapshots.
///
/// `snapshots[i].epoch == i` for every stored snapshot, and the last stored
/// snapshot is always the audit state's latest. The only way in is
/// [`DirectoryHistory::admit_range`].
#[derive(Debug, Clone)]
pub struct DirectoryHistory {
    address: String,
    state: AuditState,
    snapshots: Vec<Snapshot>,
}

impl DirectoryHistory {
    /// Start a history from an epoch-0 snapshot, pinning `key`.
    pub fn new(address: &str, key: PublicKey, initial: Snapshot) -> Result<Self, ChainError> {
        let state = AuditState::pin(key, initial.clone())?;

        Ok(Self {
            address: address.to_string(),
            state,
            snapshots: vec![initial],
        })
    }

    /// Network address the directory was registered under.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Key pinned at epoch 0.
    pub fn pinned_key(&self) -> &PublicKey {
        self.state.pinned_key()
    }

    /// Highest admitted snapshot.
    pub fn latest(&self) -> &Snapshot {
        self.state.latest()
    }

    /// Admitted snapshot for `epoch`, if any.
    pub fn snapshot_at(&self, epoch: Epoch) -> Option<&Snapshot> {
        usize::try_from(epoch)
            .ok()
            .and_then(|i| self.snapshots.get(i))
    }

    /// Admitted snapshots for the inclusive range `[start, end]`.
    ///
    /// Returns `None` if `start > end` or `end` is beyond the latest epoch.
    pub fn range(&self, start: Epoch, end: Epoch) -> Option<&[Snapshot]> {
        if start > end || end > self.state.epoch() {
            return None;
        }
        let start = usize::try_from(start).ok()?;
        let end = usize::try_from(end).ok()?;
        self.snapshots.get(start..=end)
    }

    /// Number of admitted snapshots (latest epoch + 1).
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false: a history holds at least its epoch-0 snapshot.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Admit a contiguous run of snapshots, all or nothing.
    pub fn admit_range(&mut self, range: &[Snapshot]) -> Result<usize, ChainError> {
        self.admit_range_with(range, |_| Ok::<(), ChainError>(()))
    }

    /// Admit `range`, running `persist` after verification succeeds and
    /// before anything is committed. If `persist` fails the history is
    /// left untouched.
    pub(crate) fn admit_range_with<E>(
        &mut self,
        range: &[Snapshot],
        persist: impl FnOnce(&[Snapshot]) -> Result<(), E>,
    ) -> Result<usize, E>
    where
        E: From<ChainError>,
    {
        let mut next = self.state.clone();
        let admitted = next.admit_range(range)?;

        persist(range)?;

        self.state = next;
        self.snapshots.extend_from_slice(range);
        Ok(admitted)
    }
}
