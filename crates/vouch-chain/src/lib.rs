//! Signed snapshot hash chain for key-transparency directories.
//!
//! A directory publishes one [`Snapshot`] per epoch. Each snapshot commits to
//! the directory's authenticated mapping (`root_hash`), links to its
//! predecessor by digest (`prev_snapshot_hash`), and is ed25519-signed by the
//! directory key.
//!
//! An [`AuditState`] pins the directory key on first contact and then only
//! moves forward through [`verify_link`]: one epoch at a time, every link and
//! signature checked. Range admission is all-or-nothing.

mod error;
mod snapshot;
mod state;
mod verifier;


pub use error::ChainError;
pub use snapshot::{PublicKey, SNAPSHOT_DOMAIN, Snapshot};
pub use state::AuditState;
pub use verifier::{verify_initial, verify_link};
