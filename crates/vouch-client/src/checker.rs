//! The per-session consistency-check state machine.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};
use vouch_chain::{AuditState, ChainError, PublicKey, Snapshot, verify_initial, verify_link};
use vouch_proto::{
    DirectoryProof, ProofVerifier, ProtoError, RequestKind, Response, TemporaryBinding,
};
use vouch_types::{DirectoryId, Epoch};

use crate::error::CheckError;

type Result<T> = std::result::Result<T, CheckError>;

/// Lifecycle of a [`ConsistencyChecker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerState {
    /// No directory pinned yet.
    Uninitialized,
    /// Following a directory; every observed snapshot chained so far.
    Tracking,
    /// The directory broke its own chain; nothing more is accepted.
    Faulted,
}

/// One client session's view of one directory.
///
/// Holds the client's own [`AuditState`], every snapshot it has admitted
/// (indexed by epoch), and registration promises not yet seen fulfilled.
pub struct ConsistencyChecker<V> {
    verifier: V,
    audit: Option<AuditState>,
    faulted: bool,
    observed: BTreeMap<Epoch, Snapshot>,
    promises: HashMap<String, TemporaryBinding>,
}

impl<V: ProofVerifier> ConsistencyChecker<V> {
    /// Create an uninitialized checker using `verifier` for mapping proofs.
    pub fn new(verifier: V) -> Self {
        Self {
            verifier,
            audit: None,
            faulted: false,
            observed: BTreeMap::new(),
            promises: HashMap::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CheckerState {
        match (&self.audit, self.faulted) {
            (_, true) => CheckerState::Faulted,
            (Some(_), false) => CheckerState::Tracking,
            (None, false) => CheckerState::Uninitialized,
        }
    }

    /// Pin `key` and start tracking from the directory's epoch-0 snapshot.
    pub fn init(&mut self, snapshot: &Snapshot, key: PublicKey) -> Result<()> {
        if self.audit.is_some() {
            return Err(CheckError::AlreadyInitialized);
        }

        let audit = AuditState::pin(key, snapshot.clone())?;
        self.observed.insert(snapshot.epoch, snapshot.clone());
        self.audit = Some(audit);
        Ok(())
    }

    /// Identity of the tracked directory.
    pub fn directory_id(&self) -> Option<DirectoryId> {
        self.observed.get(&0).map(Snapshot::directory_id)
    }

    /// Key pinned at initialization.
    pub fn pinned_key(&self) -> Option<&PublicKey> {
        self.audit.as_ref().map(AuditState::pinned_key)
    }

    /// Highest snapshot admitted so far.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.audit.as_ref().map(AuditState::latest)
    }

    /// The snapshot this session admitted for `epoch`.
    pub fn observed(&self, epoch: Epoch) -> Option<&Snapshot> {
        self.observed.get(&epoch)
    }

    /// Registration promise for `name` that has not been seen fulfilled yet.
    pub fn outstanding_promise(&self, name: &str) -> Option<&TemporaryBinding> {
        self.promises.get(name)
    }

    /// Validate a registration or lookup response for `name`.
    ///
    /// Admits the response's snapshots onto this session's chain, checks the
    /// mapping proof against the last of them, and compares the extracted
    /// value with `expected_key` when one is given. Returns the extracted
    /// value (`None` when a lookup proves the name absent).
    pub fn handle_response(
        &mut self,
        kind: RequestKind,
        response: &Response,
        name: &str,
        expected_key: Option<&[u8]>,
    ) -> Result<Option<Vec<u8>>> {
        if self.faulted {
            return Err(CheckError::Faulted);
        }
        if self.audit.is_none() {
            return Err(CheckError::Uninitialized);
        }

        let proof = response.as_proof()?;
        self.admit_snapshots(&proof.snapshots)?;

        let snapshot = proof
            .latest()
            .ok_or(ProtoError::Malformed("empty snapshot list"))?;
        let leaf = self.verifier.verify(&proof.proof, &snapshot.root_hash, name)?;

        let (value, promise) = match (kind, leaf) {
            (RequestKind::Registration, Some(v)) => (Some(v), None),
            (RequestKind::Registration, None) => {
                let promise = self.check_promise(proof, name, snapshot)?;
                (Some(promise.value.clone()), Some(promise))
            }
            (RequestKind::KeyLookup, leaf) => (leaf, None),
        };

        if let Some(expected) = expected_key
            && value.as_deref() != Some(expected)
        {
            return Err(CheckError::KeyMismatch {
                name: name.to_string(),
            });
        }

        if kind == RequestKind::KeyLookup {
            self.discharge_promise(name, snapshot.epoch, value.as_deref())?;
        }

        if let Some(promise) = promise {
            debug!(name, due = ?promise.due_epoch(), "accepted registration promise");
            self.promises.insert(name.to_string(), promise);
        }

        Ok(value)
    }

    /// Cross-check an auditor's history response against this session's
    /// observations.
    ///
    /// The auditor's range must itself be a validly signed, linked chain.
    /// Every epoch seen by both sides must carry byte-identical snapshots.
    /// Disagreement is attributed to the directory: the checker stays in its
    /// current state. No overlap at all is not an error.
    pub fn check_equivocation(&self, response: &Response) -> Result<()> {
        let key = self.pinned_key().ok_or(CheckError::Uninitialized)?;
        let range = response.as_history()?;

        verify_auditor_range(key, range)?;

        let mut overlapping = 0usize;
        for snap in range {
            if let Some(seen) = self.observed.get(&snap.epoch) {
                if seen != snap {
                    warn!(
                        directory = ?self.directory_id(),
                        epoch = snap.epoch,
                        "auditor history diverges from observed snapshot"
                    );
                    return Err(CheckError::Equivocation { epoch: snap.epoch });
                }
                overlapping += 1;
            }
        }

        // Ranges that only touch at a boundary still have to link up.
        if let Some(first) = range.first()
            && let Some(before) = first.epoch.checked_sub(1)
            && let Some(seen) = self.observed.get(&before)
            && first.prev_snapshot_hash != seen.digest()
        {
            warn!(epoch = first.epoch, "auditor history does not link to observed snapshot");
            return Err(CheckError::Equivocation { epoch: first.epoch });
        }

        if let Some(last) = range.last()
            && let Some(after) = last.epoch.checked_add(1)
            && let Some(seen) = self.observed.get(&after)
            && seen.prev_snapshot_hash != last.digest()
        {
            warn!(epoch = seen.epoch, "observed snapshot does not link to auditor history");
            return Err(CheckError::Equivocation { epoch: seen.epoch });
        }

        debug!(
            start = range[0].epoch,
            end = range[range.len() - 1].epoch,
            overlapping,
            "auditor history consistent"
        );
        Ok(())
    }

    /// Admit the new suffix of `snapshots`. Already observed epochs must
    /// match exactly.
    fn admit_snapshots(&mut self, snapshots: &[Snapshot]) -> Result<()> {
        let mut fresh_from = snapshots.len();

        for (i, snap) in snapshots.iter().enumerate() {
            match self.observed.get(&snap.epoch) {
                Some(seen) if seen == snap => {}
                Some(_) => {
                    warn!(epoch = snap.epoch, "directory presented a second snapshot for a known epoch");
                    self.faulted = true;
                    return Err(CheckError::Equivocation { epoch: snap.epoch });
                }
                None => {
                    fresh_from = i;
                    break;
                }
            }
        }

        let fresh = &snapshots[fresh_from..];
        if fresh.is_empty() {
            return Ok(());
        }

        let audit = self.audit.as_mut().ok_or(CheckError::Uninitialized)?;
        if let Err(e) = audit.admit_range(fresh) {
            warn!(epoch = fresh[0].epoch, error = %e, "directory response broke the chain");
            self.faulted = true;
            return Err(e.into());
        }

        for snap in fresh {
            self.observed.insert(snap.epoch, snap.clone());
        }
        Ok(())
    }

    /// A registration answered with a proof of absence must carry a valid
    /// promise for `name` under the response snapshot.
    fn check_promise(
        &self,
        proof: &DirectoryProof,
        name: &str,
        snapshot: &Snapshot,
    ) -> Result<TemporaryBinding> {
        let key = self.pinned_key().ok_or(CheckError::Uninitialized)?;
        let promise = proof
            .promise
            .as_ref()
            .ok_or(CheckError::InvalidPromise("missing registration promise"))?;

        if promise.name != name {
            return Err(CheckError::InvalidPromise("promise is for a different name"));
        }
        if !promise.is_bound_to(snapshot) {
            return Err(CheckError::InvalidPromise("promise is not bound to the response snapshot"));
        }
        if promise.due_epoch().is_none() {
            return Err(CheckError::InvalidPromise("promise can never come due"));
        }
        if !promise.verify_signature(key) {
            return Err(CheckError::InvalidPromise("bad promise signature"));
        }

        Ok(promise.clone())
    }

    /// Once a promise is due, a lookup must return the promised value.
    fn discharge_promise(&mut self, name: &str, epoch: Epoch, value: Option<&[u8]>) -> Result<()> {
        let Some(promise) = self.promises.get(name) else {
            return Ok(());
        };
        let Some(due) = promise.due_epoch() else {
            return Ok(());
        };
        if epoch < due {
            return Ok(());
        }

        if value != Some(promise.value.as_slice()) {
            warn!(name, epoch, due, "registration promise broken");
            return Err(CheckError::KeyMismatch {
                name: name.to_string(),
            });
        }

        debug!(name, epoch, "registration promise fulfilled");
        self.promises.remove(name);
        Ok(())
    }
}

/// Check that an auditor's range is a signed, internally linked chain
/// under `key`.
fn verify_auditor_range(key: &PublicKey, range: &[Snapshot]) -> std::result::Result<(), ChainError> {
    let Some(first) = range.first() else {
        return Ok(());
    };

    if first.epoch == 0 {
        verify_initial(key, first)?;
    } else if !first.verify_signature(key) {
        return Err(ChainError::InvalidSignature { epoch: first.epoch });
    }

    for pair in range.windows(2) {
        verify_link(key, &pair[0], &pair[1])?;
    }
    Ok(())
}
