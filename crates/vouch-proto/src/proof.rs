//! Interface to the authenticated-mapping proof verifier.

use std::sync::Arc;

use vouch_types::Digest;

/// A proof that failed verification against the given root.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("proof rejected: {0}")]
pub struct ProofError(pub String);

/// Verifies lookup proofs produced by a directory's authenticated tree.
pub trait ProofVerifier: Send + Sync {
    /// Check `proof` for `name` against `root_hash`.
    ///
    /// Returns the leaf value bound to `name`, or `None` for a valid proof
    /// of absence.
    fn verify(
        &self,
        proof: &[u8],
        root_hash: &Digest,
        name: &str,
    ) -> Result<Option<Vec<u8>>, ProofError>;
}

impl<T: ProofVerifier + ?Sized> ProofVerifier for Arc<T> {
    fn verify(
        &self,
        proof: &[u8],
        root_hash: &Digest,
        name: &str,
    ) -> Result<Option<Vec<u8>>, ProofError> {
        (**self).verify(proof, root_hash, name)
    }
}
