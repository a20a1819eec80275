//! Protocol messages and collaborator interfaces.
//!
//! Directories answer [`RegistrationRequest`] and [`KeyLookupRequest`] with a
//! [`DirectoryProof`]; auditors answer [`AuditingRequest`] with a snapshot
//! history. Both travel in a [`Response`] carrying a [`StatusCode`].
//!
//! The authenticated name → key mapping itself is external: its proofs are
//! opaque bytes checked through the [`ProofVerifier`] trait.
//!
//! [`StatusCode`]: vouch_types::StatusCode

mod binding;
mod error;
mod message;
mod proof;

pub use binding::{BINDING_DOMAIN, TemporaryBinding};
pub use error::ProtoError;
pub use message::{
    AuditingRequest, DirectoryProof, DirectoryResponse, KeyLookupRequest, RegistrationRequest,
    RequestKind, Response,
};
pub use proof::{ProofError, ProofVerifier};
