//! The auditor's index of directory histories.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, warn};
use vouch_chain::{PublicKey, Snapshot};
use vouch_proto::{AuditingRequest, Response};
use vouch_types::{DirectoryId, Epoch};

use crate::error::AuditLogError;
use crate::history::DirectoryHistory;
use crate::store::{DirectoryRecord, HistoryStore};

type Result<T> = std::result::Result<T, AuditLogError>;

/// Summary of one audited directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySummary {
    pub id: DirectoryId,
    pub address: String,
    pub latest_epoch: Epoch,
}

/// Verified snapshot histories of every directory this auditor watches.
///
/// The outer lock only guards membership. Each history sits behind its own
/// mutex, held across the whole admit-then-store sequence and across range
/// reads, so a reader never sees a partially admitted range. Distinct
/// directories never contend on the same mutex.
///
/// New directories are created under `init_lock`, which serializes creation
/// without blocking lookups while the initial history is written out.
pub struct AuditLog {
    histories: RwLock<HashMap<DirectoryId, Arc<Mutex<DirectoryHistory>>>>,
    init_lock: Mutex<()>,
    store: Option<HistoryStore>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog {
    /// Create an empty, unpersisted audit log.
    pub fn new() -> Self {
        Self {
            histories: RwLock::new(HashMap::new()),
            init_lock: Mutex::new(()),
            store: None,
        }
    }

    /// Open an audit log over `store`, re-admitting every stored history
    /// from epoch 0.
    ///
    /// Fails if any stored history no longer passes chain admission.
    pub fn open(store: HistoryStore) -> Result<Self> {
        let mut histories = HashMap::new();

        for (id, record) in store.list_directories()? {
            let snapshots = store.load_snapshots(&id)?;
            if snapshots.first().map(Snapshot::directory_id) != Some(id) {
                return Err(AuditLogError::Storage(format!(
                    "stored history does not match directory {id}"
                )));
            }

            let history = build_history(&record.address, record.pinned_key, &snapshots)?;
            info!(
                directory = %id,
                address = %record.address,
                epoch = history.latest().epoch,
                "reloaded history"
            );
            histories.insert(id, Arc::new(Mutex::new(history)));
        }

        Ok(Self {
            histories: RwLock::new(histories),
            init_lock: Mutex::new(()),
            store: Some(store),
        })
    }

    /// Start auditing a directory from its epoch-0 snapshot onwards.
    ///
    /// `snapshots[0]` pins `key` and defines the directory's identity; the
    /// rest are admitted as one range. Nothing is stored unless every
    /// snapshot is admitted.
    pub fn init_history(
        &self,
        address: &str,
        key: PublicKey,
        snapshots: &[Snapshot],
    ) -> Result<DirectoryId> {
        let first = snapshots
            .first()
            .ok_or(AuditLogError::Malformed("empty snapshot list"))?;
        if first.epoch != 0 {
            return Err(AuditLogError::Malformed("history must start at epoch 0"));
        }

        let id = first.directory_id();
        if self.contains(&id) {
            return Err(AuditLogError::AlreadyExists(id));
        }

        let history = build_history(address, key, snapshots).inspect_err(|e| {
            warn!(directory = %id, error = %e, "rejected initial history");
        })?;

        let _creating = self.init_lock.lock().expect("init lock poisoned");
        if self.contains(&id) {
            return Err(AuditLogError::AlreadyExists(id));
        }

        if let Some(store) = &self.store {
            let record = DirectoryRecord {
                address: address.to_string(),
                pinned_key: key,
            };
            store.put_directory(&id, &record, snapshots)?;
        }

        info!(
            directory = %id,
            address,
            epoch = history.latest().epoch,
            "created history"
        );
        self.histories
            .write()
            .expect("audit log lock poisoned")
            .insert(id, Arc::new(Mutex::new(history)));
        Ok(id)
    }

    /// Admit `range` onto the directory's history, all or nothing.
    ///
    /// Returns the number of snapshots admitted.
    pub fn extend(&self, id: &DirectoryId, range: &[Snapshot]) -> Result<usize> {
        if range.is_empty() {
            return Err(AuditLogError::Malformed("empty snapshot list"));
        }

        let handle = self.handle(id)?;
        let mut history = handle.lock().expect("history lock poisoned");

        let result = history.admit_range_with(range, |admitted| match &self.store {
            Some(store) => store.put_snapshots(id, admitted),
            None => Ok(()),
        });

        match result {
            Ok(admitted) => {
                debug!(directory = %id, epoch = history.latest().epoch, admitted, "extended history");
                Ok(admitted)
            }
            Err(e) => {
                warn!(
                    directory = %id,
                    first_epoch = range[0].epoch,
                    latest = history.latest().epoch,
                    error = %e,
                    "rejected snapshot range"
                );
                Err(e)
            }
        }
    }

    /// Ingest a directory's history response, then extend with its snapshots.
    pub fn audit_response(&self, id: &DirectoryId, response: &Response) -> Result<usize> {
        let range = response.as_history()?;
        self.extend(id, range)
    }

    /// Answer an auditing request.
    ///
    /// Failures are reported through the response status.
    pub fn get_observed_strs(&self, request: &AuditingRequest) -> Response {
        match self.observed_range(&request.directory_id, request.start_epoch, request.end_epoch) {
            Ok(snapshots) => Response::history(snapshots),
            Err(e) => {
                debug!(directory = %request.directory_id, error = %e, "auditing request failed");
                Response::error(e.status())
            }
        }
    }

    /// Admitted snapshots for the inclusive range `[start, end]`.
    pub fn observed_range(&self, id: &DirectoryId, start: Epoch, end: Epoch) -> Result<Vec<Snapshot>> {
        let handle = self.handle(id)?;
        let history = handle.lock().expect("history lock poisoned");

        history
            .range(start, end)
            .map(<[Snapshot]>::to_vec)
            .ok_or(AuditLogError::Malformed("epoch range out of bounds"))
    }

    /// Highest admitted snapshot of a directory.
    pub fn latest(&self, id: &DirectoryId) -> Result<Snapshot> {
        let handle = self.handle(id)?;
        let history = handle.lock().expect("history lock poisoned");
        Ok(history.latest().clone())
    }

    /// Whether a history exists for `id`.
    pub fn contains(&self, id: &DirectoryId) -> bool {
        self.histories
            .read()
            .expect("audit log lock poisoned")
            .contains_key(id)
    }

    /// Every audited directory, ordered by identity.
    pub fn directories(&self) -> Vec<DirectorySummary> {
        let handles: Vec<_> = self
            .histories
            .read()
            .expect("audit log lock poisoned")
            .iter()
            .map(|(id, h)| (*id, Arc::clone(h)))
            .collect();

        let mut out: Vec<DirectorySummary> = handles
            .into_iter()
            .map(|(id, handle)| {
                let history = handle.lock().expect("history lock poisoned");
                DirectorySummary {
                    id,
                    address: history.address().to_string(),
                    latest_epoch: history.latest().epoch,
                }
            })
            .collect();

        out.sort_by_key(|s| s.id);
        out
    }

    fn handle(&self, id: &DirectoryId) -> Result<Arc<Mutex<DirectoryHistory>>> {
        self.histories
            .read()
            .expect("audit log lock poisoned")
            .get(id)
            .cloned()
            .ok_or(AuditLogError::UnknownDirectory(*id))
    }
}

/// Pin `key` with `snapshots[0]` and admit the remainder.
fn build_history(address: &str, key: PublicKey, snapshots: &[Snapshot]) -> Result<DirectoryHistory> {
    let (first, rest) = snapshots
        .split_first()
        .ok_or(AuditLogError::Malformed("empty snapshot list"))?;

    let mut history = DirectoryHistory::new(address, key, first.clone())?;
    history.admit_range(rest)?;
    Ok(history)
}
