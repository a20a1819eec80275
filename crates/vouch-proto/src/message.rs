//! Request and response shapes exchanged with directories and auditors.
//!
//! All messages are postcard-serializable; transport is up to the caller.

use serde::{Deserialize, Serialize};
use vouch_chain::Snapshot;
use vouch_types::{DirectoryId, Epoch, StatusCode};

use crate::binding::TemporaryBinding;
use crate::error::ProtoError;

type Result<T> = std::result::Result<T, ProtoError>;

/// Which directory operation a response answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    /// Bind a name to a key.
    Registration,
    /// Fetch the key bound to a name.
    KeyLookup,
}

/// Ask a directory to bind `name` to `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub key: Vec<u8>,
}

/// Ask a directory for the key currently bound to `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLookupRequest {
    pub name: String,
}

/// Ask an auditor for the snapshots it observed for a directory,
/// over the inclusive range `[start_epoch, end_epoch]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditingRequest {
    pub directory_id: DirectoryId,
    pub start_epoch: Epoch,
    pub end_epoch: Epoch,
}

/// A directory's answer to a registration or lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryProof {
    /// Ascending, contiguous snapshots ending at the one `proof` is computed
    /// against. Earlier entries let a client bridge epochs it missed.
    pub snapshots: Vec<Snapshot>,
    /// Opaque authenticated-mapping proof for the requested name.
    pub proof: Vec<u8>,
    /// Registration promise, present when the name is not yet in the mapping.
    pub promise: Option<TemporaryBinding>,
}

impl DirectoryProof {
    /// The snapshot the proof is computed against.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }
}

/// Body of a successful [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryResponse {
    /// Answer to a registration or lookup.
    Proof(DirectoryProof),
    /// Contiguous run of snapshots, from an auditor or a directory feed.
    History(Vec<Snapshot>),
}

/// A status code plus, on success, a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: StatusCode,
    pub body: Option<DirectoryResponse>,
}

impl Response {
    /// A failure response with no body.
    pub fn error(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    /// A successful registration or lookup answer.
    pub fn proof(proof: DirectoryProof) -> Self {
        Self {
            status: StatusCode::Ok,
            body: Some(DirectoryResponse::Proof(proof)),
        }
    }

    /// A successful snapshot history answer.
    pub fn history(snapshots: Vec<Snapshot>) -> Self {
        Self {
            status: StatusCode::Ok,
            body: Some(DirectoryResponse::History(snapshots)),
        }
    }

    /// Check the response shape and surface a failure status as an error.
    ///
    /// Every snapshot run carried in the body must be non-empty and have
    /// strictly consecutive epochs.
    pub fn validate(&self) -> Result<&DirectoryResponse> {
        if !self.status.is_ok() {
            return Err(ProtoError::Status(self.status));
        }

        let body = self
            .body
            .as_ref()
            .ok_or(ProtoError::Malformed("missing response body"))?;

        let snapshots = match body {
            DirectoryResponse::Proof(p) => &p.snapshots,
            DirectoryResponse::History(h) => h,
        };

        if snapshots.is_empty() {
            return Err(ProtoError::Malformed("empty snapshot list"));
        }

        if snapshots
            .windows(2)
            .any(|w| w[0].epoch.checked_add(1) != Some(w[1].epoch))
        {
            return Err(ProtoError::Malformed("non-contiguous snapshot list"));
        }

        Ok(body)
    }

    /// Validate and return the directory proof body.
    pub fn as_proof(&self) -> Result<&DirectoryProof> {
        match self.validate()? {
            DirectoryResponse::Proof(p) => Ok(p),
            DirectoryResponse::History(_) => Err(ProtoError::Malformed("expected a directory proof")),
        }
    }

    /// Validate and return the snapshot history body.
    pub fn as_history(&self) -> Result<&[Snapshot]> {
        match self.validate()? {
            DirectoryResponse::History(h) => Ok(h),
            DirectoryResponse::Proof(_) => Err(ProtoError::Malformed("expected a snapshot history")),
        }
    }

    /// Serialize for transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Deserialize from transport bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(postcard::from_bytes(bytes)?)
    }
}
