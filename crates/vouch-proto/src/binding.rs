//! Signed registration promises.
//!
//! A registration accepted during epoch `e` cannot appear in the already
//! signed snapshot `e`. The directory instead returns a [`TemporaryBinding`]:
//! a promise, signed with the directory key and bound to snapshot `e`, that
//! `name → value` will be in the mapping from epoch `e + 1` on.

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use vouch_chain::{PublicKey, Snapshot};
use vouch_types::{Digest, Epoch};

/// Domain tag prefixed to every binding signature message.
pub const BINDING_DOMAIN: &str = "vouch/temporary-binding/v1";

/// A directory's signed promise to publish `name → value` next epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryBinding {
    /// Registered name.
    pub name: String,
    /// Value the name will be bound to.
    pub value: Vec<u8>,
    /// Digest of the snapshot the promise was issued under.
    pub snapshot_digest: Digest,
    /// Epoch of that snapshot.
    pub issued_at: Epoch,
    /// First half (`R`) of the ed25519 promise signature.
    pub signature_r: [u8; 32],
    /// Second half (`s`) of the ed25519 promise signature.
    pub signature_s: [u8; 32],
}

#[derive(Serialize)]
struct PromiseContent<'a> {
    domain: &'static str,
    name: &'a str,
    value: &'a [u8],
    snapshot_digest: Digest,
    issued_at: Epoch,
}

impl TemporaryBinding {
    fn signed_bytes(name: &str, value: &[u8], snapshot_digest: Digest, issued_at: Epoch) -> Vec<u8> {
        let content = PromiseContent {
            domain: BINDING_DOMAIN,
            name,
            value,
            snapshot_digest,
            issued_at,
        };
        postcard::to_allocvec(&content).expect("serialization should not fail")
    }

    /// Sign a promise under the snapshot `issued_under`.
    pub fn new_signed(
        name: &str,
        value: &[u8],
        issued_under: &Snapshot,
        signing_key: &SigningKey,
    ) -> Self {
        let snapshot_digest = issued_under.digest();
        let msg = Self::signed_bytes(name, value, snapshot_digest, issued_under.epoch);
        let sig_bytes = signing_key.sign(&msg).to_bytes();
        let mut signature_r = [0u8; 32];
        let mut signature_s = [0u8; 32];
        signature_r.copy_from_slice(&sig_bytes[..32]);
        signature_s.copy_from_slice(&sig_bytes[32..]);

        Self {
            name: name.to_string(),
            value: value.to_vec(),
            snapshot_digest,
            issued_at: issued_under.epoch,
            signature_r,
            signature_s,
        }
    }

    /// Epoch from which the promised binding must be visible, or `None` if
    /// it was issued at the last representable epoch.
    pub fn due_epoch(&self) -> Option<Epoch> {
        self.issued_at.checked_add(1)
    }

    /// Whether this promise was issued under `snapshot`.
    pub fn is_bound_to(&self, snapshot: &Snapshot) -> bool {
        self.issued_at == snapshot.epoch && self.snapshot_digest == snapshot.digest()
    }

    /// Verify the promise signature under the directory key.
    pub fn verify_signature(&self, key: &PublicKey) -> bool {
        let msg = Self::signed_bytes(&self.name, &self.value, self.snapshot_digest, self.issued_at);
        let mut sig = [0u8; 64];
        sig[..32].copy_from_slice(&self.signature_r);
        sig[32..].copy_from_slice(&self.signature_s);
        key.verify(&msg, &sig)
    }
}
