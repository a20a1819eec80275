//! Shared test harness for vouch integration tests.
//!
//! Provides [`TestDirectory`], an in-process key-transparency directory that
//! signs one snapshot per epoch and answers registrations and lookups, and
//! [`MapProofVerifier`], the matching mapping-proof verifier.
//!
//! The "authenticated mapping" here is a whole-map commitment: the proof for
//! any name is the full encoded mapping, and the root hash is its BLAKE3
//! digest. That is enough to make proofs binding without a real tree.

use std::collections::BTreeMap;

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use vouch_chain::{PublicKey, Snapshot};
use vouch_client::ConsistencyChecker;
use vouch_proto::{
    DirectoryProof, KeyLookupRequest, ProofError, ProofVerifier, RegistrationRequest, Response,
    TemporaryBinding,
};
use vouch_types::{Digest, DirectoryId, Epoch, StatusCode};

/// Names to values.
pub type Mapping = BTreeMap<String, Vec<u8>>;

/// What a root hash commits to.
///
/// `salt` lets two forks of one directory produce different roots even when
/// their mappings are equal.
#[derive(Serialize, Deserialize)]
struct Commitment {
    salt: Vec<u8>,
    entries: Mapping,
}

fn commit(salt: &[u8], entries: &Mapping) -> (Digest, Vec<u8>) {
    let proof = postcard::to_allocvec(&Commitment {
        salt: salt.to_vec(),
        entries: entries.clone(),
    })
    .expect("serialization should not fail");
    (Digest::from_data(&proof), proof)
}

// =========================================================================
// Proof verifier
// =========================================================================

/// Verifies whole-map commitment proofs produced by [`TestDirectory`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MapProofVerifier;

impl ProofVerifier for MapProofVerifier {
    fn verify(
        &self,
        proof: &[u8],
        root_hash: &Digest,
        name: &str,
    ) -> Result<Option<Vec<u8>>, ProofError> {
        if Digest::from_data(proof) != *root_hash {
            return Err(ProofError("proof does not hash to root".into()));
        }
        let commitment: Commitment =
            postcard::from_bytes(proof).map_err(|e| ProofError(e.to_string()))?;
        Ok(commitment.entries.get(name).cloned())
    }
}

// =========================================================================
// Test directory
// =========================================================================

/// An honest (or, after [`TestDirectory::fork`], deliberately split)
/// directory.
#[derive(Clone)]
pub struct TestDirectory {
    signing_key: SigningKey,
    salt: Vec<u8>,
    /// Mapping committed by the latest snapshot.
    committed: Mapping,
    /// Mapping to publish at the next [`TestDirectory::update`].
    pending: Mapping,
    snapshots: Vec<Snapshot>,
    /// Commitment bytes per epoch, the proof for every lookup at that epoch.
    proofs: Vec<Vec<u8>>,
}

impl TestDirectory {
    /// Create a directory with an empty mapping at epoch 0.
    pub fn new(seed: u8) -> Self {
        let signing_key = SigningKey::from_bytes(&[seed; 32]);
        let (root, proof) = commit(&[], &Mapping::new());
        let genesis = Snapshot::genesis(root, &signing_key);

        Self {
            signing_key,
            salt: Vec::new(),
            committed: Mapping::new(),
            pending: Mapping::new(),
            snapshots: vec![genesis],
            proofs: vec![proof],
        }
    }

    /// The directory's public key.
    pub fn key(&self) -> PublicKey {
        PublicKey::from_signing_key(&self.signing_key)
    }

    /// Identity of the directory (digest of its epoch-0 snapshot).
    pub fn id(&self) -> DirectoryId {
        self.snapshots[0].directory_id()
    }

    /// The latest signed snapshot.
    pub fn latest_snapshot(&self) -> &Snapshot {
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// The current epoch.
    pub fn epoch(&self) -> Epoch {
        self.latest_snapshot().epoch
    }

    /// Snapshots for the inclusive range `[start, end]`.
    pub fn snapshots(&self, start: Epoch, end: Epoch) -> Vec<Snapshot> {
        self.snapshots[start as usize..=end as usize].to_vec()
    }

    /// The directory's own feed of its history, as an auditor would pull it.
    pub fn history_response(&self, start: Epoch, end: Epoch) -> Response {
        Response::history(self.snapshots(start, end))
    }

    /// Accept a registration for the next epoch.
    ///
    /// Names already committed with the same key are answered with a plain
    /// proof; everything else gets a signed promise.
    pub fn register(&mut self, request: &RegistrationRequest) -> Response {
        let latest = self.latest_snapshot().clone();
        let proof = self.proofs[self.proofs.len() - 1].clone();

        if self.committed.get(&request.name) == Some(&request.key) {
            return Response::proof(DirectoryProof {
                snapshots: vec![latest],
                proof,
                promise: None,
            });
        }

        if self.pending.contains_key(&request.name) {
            return Response::error(StatusCode::AlreadyExists);
        }

        self.pending
            .insert(request.name.clone(), request.key.clone());
        let promise =
            TemporaryBinding::new_signed(&request.name, &request.key, &latest, &self.signing_key);

        Response::proof(DirectoryProof {
            snapshots: vec![latest],
            proof,
            promise: Some(promise),
        })
    }

    /// Answer a lookup at the latest epoch.
    pub fn lookup(&self, _request: &KeyLookupRequest) -> Response {
        self.lookup_at(self.epoch())
    }

    /// Answer a lookup against an older epoch.
    pub fn lookup_at(&self, epoch: Epoch) -> Response {
        Response::proof(DirectoryProof {
            snapshots: vec![self.snapshots[epoch as usize].clone()],
            proof: self.proofs[epoch as usize].clone(),
            promise: None,
        })
    }

    /// Answer a lookup at the latest epoch, including every snapshot after
    /// `since` so a lagging client can bridge the gap.
    pub fn lookup_since(&self, since: Epoch) -> Response {
        let epoch = self.epoch();
        Response::proof(DirectoryProof {
            snapshots: self.snapshots(since + 1, epoch),
            proof: self.proofs[epoch as usize].clone(),
            promise: None,
        })
    }

    /// Publish pending registrations in a new signed snapshot.
    pub fn update(&mut self) -> Snapshot {
        self.committed = self.pending.clone();
        let (root, proof) = commit(&self.salt, &self.committed);
        let next = self.latest_snapshot().successor(root, &self.signing_key);

        self.snapshots.push(next.clone());
        self.proofs.push(proof);
        next
    }

    /// Split off an independent history sharing everything up to now.
    ///
    /// Both copies keep the same key and identity; from the next update on
    /// they sign different snapshots for the same epochs.
    pub fn fork(&self, tag: &str) -> TestDirectory {
        let mut fork = self.clone();
        fork.salt = tag.as_bytes().to_vec();
        fork
    }
}

// =========================================================================
// Helpers
// =========================================================================

/// A fresh client session pinned to `dir`'s epoch-0 snapshot.
pub fn new_client(dir: &TestDirectory) -> ConsistencyChecker<MapProofVerifier> {
    let mut checker = ConsistencyChecker::new(MapProofVerifier);
    checker
        .init(&dir.snapshots[0], dir.key())
        .expect("genesis snapshot should pin");
    checker
}

/// Build a registration request.
pub fn registration(name: &str, key: &[u8]) -> RegistrationRequest {
    RegistrationRequest {
        name: name.to_string(),
        key: key.to_vec(),
    }
}

/// Build a lookup request.
pub fn lookup(name: &str) -> KeyLookupRequest {
    KeyLookupRequest {
        name: name.to_string(),
    }
}
