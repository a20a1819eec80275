//! Signed tree root ("snapshot") of a directory at one epoch.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use vouch_types::{Digest, DirectoryId, Epoch};

use crate::error::ChainError;

/// A directory's ed25519 public signing key, as raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// The public half of a directory signing key.
    pub fn from_signing_key(signing_key: &SigningKey) -> Self {
        Self(signing_key.verifying_key().to_bytes())
    }

    /// Return the raw 32-byte representation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decode into a dalek verifying key.
    pub fn to_verifying_key(&self) -> Result<VerifyingKey, ChainError> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| ChainError::InvalidKey)
    }

    /// Verify an ed25519 signature over `msg`. Invalid key bytes never verify.
    pub fn verify(&self, msg: &[u8], signature: &[u8; 64]) -> bool {
        let Ok(verifying_key) = self.to_verifying_key() else {
            return false;
        };
        let signature = Signature::from_bytes(signature);
        verifying_key.verify(msg, &signature).is_ok()
    }
}

impl From<[u8; 32]> for PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

/// An immutable, signed statement of a directory's state at one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Epoch number; 0 for the first snapshot of a directory.
    pub epoch: Epoch,
    /// Root of the authenticated name → key mapping at this epoch.
    pub root_hash: Digest,
    /// Digest of the previous snapshot; [`Digest::ZERO`] at epoch 0.
    pub prev_snapshot_hash: Digest,
    /// First half (`R`) of the ed25519 signature over the signed content.
    /// Split because serde has no derive for `[u8; 64]`.
    pub signature_r: [u8; 32],
    /// Second half (`s`) of the ed25519 signature.
    pub signature_s: [u8; 32],
}

/// Domain tag prefixed to every snapshot signature message.
pub const SNAPSHOT_DOMAIN: &str = "vouch/snapshot/v1";

/// The signed fields of a [`Snapshot`], in canonical order.
#[derive(Serialize)]
struct SignedContent {
    domain: &'static str,
    epoch: Epoch,
    root_hash: Digest,
    prev_snapshot_hash: Digest,
}

impl Snapshot {
    /// Canonical encoding of the signed fields.
    pub fn signed_bytes(epoch: Epoch, root_hash: Digest, prev_snapshot_hash: Digest) -> Vec<u8> {
        let content = SignedContent {
            domain: SNAPSHOT_DOMAIN,
            epoch,
            root_hash,
            prev_snapshot_hash,
        };
        postcard::to_allocvec(&content).expect("serialization should not fail")
    }

    /// Create a new signed snapshot.
    pub fn new_signed(
        epoch: Epoch,
        root_hash: Digest,
        prev_snapshot_hash: Digest,
        signing_key: &SigningKey,
    ) -> Self {
        let msg = Self::signed_bytes(epoch, root_hash, prev_snapshot_hash);
        let sig_bytes = signing_key.sign(&msg).to_bytes();
        let mut signature_r = [0u8; 32];
        let mut signature_s = [0u8; 32];
        signature_r.copy_from_slice(&sig_bytes[..32]);
        signature_s.copy_from_slice(&sig_bytes[32..]);

        Self {
            epoch,
            root_hash,
            prev_snapshot_hash,
            signature_r,
            signature_s,
        }
    }

    /// Sign the epoch-0 snapshot of a new directory.
    pub fn genesis(root_hash: Digest, signing_key: &SigningKey) -> Self {
        Self::new_signed(0, root_hash, Digest::ZERO, signing_key)
    }

    /// Sign the snapshot that follows `self`.
    pub fn successor(&self, root_hash: Digest, signing_key: &SigningKey) -> Self {
        Self::new_signed(self.epoch + 1, root_hash, self.digest(), signing_key)
    }

    /// Canonical encoding of the full snapshot, signature included.
    pub fn encode(&self) -> Vec<u8> {
        postcard::to_allocvec(self).expect("serialization should not fail")
    }

    /// BLAKE3 digest of [`Snapshot::encode`]; the successor's back-link.
    pub fn digest(&self) -> Digest {
        Digest::from_data(&self.encode())
    }

    /// Identity of the directory this snapshot starts, if it is an epoch-0 snapshot.
    pub fn directory_id(&self) -> DirectoryId {
        DirectoryId::from(self.digest())
    }

    /// Reconstruct the 64-byte signature from its two halves.
    pub fn signature_bytes(&self) -> [u8; 64] {
        let mut sig = [0u8; 64];
        sig[..32].copy_from_slice(&self.signature_r);
        sig[32..].copy_from_slice(&self.signature_s);
        sig
    }

    /// Verify the signature over the signed fields under `key`.
    pub fn verify_signature(&self, key: &PublicKey) -> bool {
        let msg = Self::signed_bytes(self.epoch, self.root_hash, self.prev_snapshot_hash);
        key.verify(&msg, &self.signature_bytes())
    }
}
