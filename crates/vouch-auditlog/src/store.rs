//! Persistence for audited histories (Fjall disk or pure in-memory).
//!
//! Layout, per directory:
//! - `directories`: `DirectoryId` → postcard [`DirectoryRecord`]
//! - `snapshots`: `DirectoryId ‖ epoch (8 bytes BE)` → postcard [`Snapshot`]
//!
//! Big-endian epochs make a prefix scan return a directory's snapshots in
//! epoch order, which is all reload needs to replay admission from epoch 0.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::RwLock;

use fjall::{Database, Keyspace, KeyspaceCreateOptions};
use serde::{Deserialize, Serialize};
use vouch_chain::{PublicKey, Snapshot};
use vouch_types::{DIGEST_LEN, DirectoryId, Epoch};

use crate::error::AuditLogError;

type Result<T> = std::result::Result<T, AuditLogError>;

/// Per-directory metadata needed to rebuild its audit state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Network address the directory was registered under.
    pub address: String,
    /// Key pinned at epoch 0.
    pub pinned_key: PublicKey,
}

/// Inner backend: either Fjall-backed (disk) or pure in-memory.
enum Backend {
    Fjall {
        db: Database,
        directories: Keyspace,
        snapshots: Keyspace,
    },
    Memory(RwLock<MemoryTables>),
}

/// Pure in-memory storage. Both tables sit behind one lock so a write that
/// touches both is applied as a unit.
#[derive(Default)]
struct MemoryTables {
    /// DirectoryId → serialized DirectoryRecord.
    directories: HashMap<DirectoryId, Vec<u8>>,
    /// id ‖ epoch → serialized Snapshot.
    snapshots: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// Storage backend for audited directory histories.
///
/// Every write method commits all of its keys at once or none of them.
pub struct HistoryStore {
    backend: Backend,
    #[cfg(test)]
    fail_writes: std::sync::atomic::AtomicBool,
}

fn storage_err(e: impl std::fmt::Display) -> AuditLogError {
    AuditLogError::Storage(e.to_string())
}

fn snapshot_key(id: &DirectoryId, epoch: Epoch) -> [u8; DIGEST_LEN + 8] {
    let mut key = [0u8; DIGEST_LEN + 8];
    key[..DIGEST_LEN].copy_from_slice(id.as_bytes());
    key[DIGEST_LEN..].copy_from_slice(&epoch.to_be_bytes());
    key
}

fn directory_id_from_key(k: &[u8]) -> Result<DirectoryId> {
    let arr: [u8; DIGEST_LEN] = k
        .get(..DIGEST_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| AuditLogError::Storage("truncated directory key".into()))?;
    Ok(DirectoryId::from(arr))
}

impl HistoryStore {
    /// Open a persistent store at the given path (Fjall backend).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::builder(path).open().map_err(storage_err)?;
        let backend = Self::init_fjall(db)?;
        Ok(Self::with_backend(backend))
    }

    /// Open a temporary store backed by Fjall (cleaned up on drop).
    pub fn open_temporary() -> Result<Self> {
        let tmp = tempfile::tempdir().map_err(storage_err)?;
        let db = Database::builder(tmp.path())
            .temporary(true)
            .open()
            .map_err(storage_err)?;
        let backend = Self::init_fjall(db)?;
        Ok(Self::with_backend(backend))
    }

    /// Create a pure in-memory store.
    pub fn in_memory() -> Self {
        Self::with_backend(Backend::Memory(RwLock::default()))
    }

    fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            #[cfg(test)]
            fail_writes: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Make every following write fail before anything is committed.
    #[cfg(test)]
    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AuditLogError::Storage("injected write failure".into()));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check_writable(&self) -> Result<()> {
        Ok(())
    }

    /// Commit one directory record (if any) and a run of snapshots together.
    fn write(
        &self,
        id: &DirectoryId,
        record: Option<&DirectoryRecord>,
        snapshots: &[Snapshot],
    ) -> Result<()> {
        let record = record.map(postcard::to_allocvec).transpose()?;
        let mut encoded = Vec::with_capacity(snapshots.len());
        for snap in snapshots {
            encoded.push((snapshot_key(id, snap.epoch), postcard::to_allocvec(snap)?));
        }

        self.check_writable()?;

        match &self.backend {
            Backend::Fjall {
                db,
                directories,
                snapshots,
            } => {
                let mut batch = db.batch();
                if let Some(bytes) = record {
                    batch.insert(directories, &id.as_bytes()[..], bytes);
                }
                for (key, bytes) in encoded {
                    batch.insert(snapshots, &key[..], bytes);
                }
                batch.commit().map_err(storage_err)?;
            }
            Backend::Memory(m) => {
                let mut tables = m.write().unwrap();
                if let Some(bytes) = record {
                    tables.directories.insert(*id, bytes);
                }
                for (key, bytes) in encoded {
                    tables.snapshots.insert(key.to_vec(), bytes);
                }
            }
        }
        Ok(())
    }

    fn init_fjall(db: Database) -> Result<Backend> {
        let directories = db
            .keyspace("directories", KeyspaceCreateOptions::default)
            .map_err(storage_err)?;
        let snapshots = db
            .keyspace("snapshots", KeyspaceCreateOptions::default)
            .map_err(storage_err)?;
        Ok(Backend::Fjall {
            db,
            directories,
            snapshots,
        })
    }

    // ----- Directories -----

    /// Store a new directory's record together with its initial snapshots.
    pub fn put_directory(
        &self,
        id: &DirectoryId,
        record: &DirectoryRecord,
        snapshots: &[Snapshot],
    ) -> Result<()> {
        self.write(id, Some(record), snapshots)
    }

    /// Retrieve the record for a directory.
    pub fn get_directory(&self, id: &DirectoryId) -> Result<Option<DirectoryRecord>> {
        let bytes = match &self.backend {
            Backend::Fjall { directories, .. } => directories
                .get(id.as_bytes())
                .map_err(storage_err)?
                .map(|v| v.to_vec()),
            Backend::Memory(m) => m.read().unwrap().directories.get(id).cloned(),
        };

        match bytes {
            Some(b) => Ok(Some(postcard::from_bytes(&b)?)),
            None => Ok(None),
        }
    }

    /// List every stored directory.
    pub fn list_directories(&self) -> Result<Vec<(DirectoryId, DirectoryRecord)>> {
        match &self.backend {
            Backend::Fjall { directories, .. } => {
                let mut result = Vec::new();

                for guard in directories.iter() {
                    let (key_bytes, val_bytes) = guard.into_inner().map_err(storage_err)?;
                    let id = directory_id_from_key(&key_bytes)?;
                    let record: DirectoryRecord = postcard::from_bytes(&val_bytes)?;
                    result.push((id, record));
                }

                Ok(result)
            }
            Backend::Memory(m) => {
                let tables = m.read().unwrap();
                let mut result = Vec::with_capacity(tables.directories.len());

                for (id, bytes) in tables.directories.iter() {
                    result.push((*id, postcard::from_bytes(bytes)?));
                }

                Ok(result)
            }
        }
    }

    // ----- Snapshots -----

    /// Append admitted snapshots to a directory's stored history.
    pub fn put_snapshots(&self, id: &DirectoryId, snapshots: &[Snapshot]) -> Result<()> {
        self.write(id, None, snapshots)
    }

    /// Load a directory's stored snapshots in epoch order.
    pub fn load_snapshots(&self, id: &DirectoryId) -> Result<Vec<Snapshot>> {
        match &self.backend {
            Backend::Fjall { snapshots, .. } => {
                let mut result = Vec::new();

                for guard in snapshots.prefix(id.as_bytes()) {
                    let (_, val_bytes) = guard.into_inner().map_err(storage_err)?;
                    result.push(postcard::from_bytes(&val_bytes)?);
                }

                Ok(result)
            }
            Backend::Memory(m) => {
                let tables = m.read().unwrap();
                let start = snapshot_key(id, 0).to_vec();
                let prefix = id.as_bytes();
                let mut result = Vec::new();

                for (_, bytes) in tables
                    .snapshots
                    .range(start..)
                    .take_while(|(k, _)| k.starts_with(prefix))
                {
                    result.push(postcard::from_bytes(bytes)?);
                }

                Ok(result)
            }
        }
    }
}
