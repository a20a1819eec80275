//! Shared types and identifiers for vouch.
//!
//! This crate defines the value types used across the workspace:
//! fixed-size identifiers ([`Digest`], [`DirectoryId`]) and the outward
//! status taxonomy ([`StatusCode`], [`FaultClass`]) that every component
//! maps its errors onto.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Size in bytes of every digest produced by the hash primitive.
pub const DIGEST_LEN: usize = 32;

/// Epoch number of a directory snapshot. Strictly increasing, starting at 0.
pub type Epoch = u64;

// ---------------------------------------------------------------------------
// ID types
// ---------------------------------------------------------------------------

/// Error returned when parsing a hex-encoded identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    /// The input is not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded input has the wrong length.
    #[error("expected {DIGEST_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name([u8; DIGEST_LEN]);

        impl $name {
            /// The all-zero value.
            pub const ZERO: Self = Self([0u8; DIGEST_LEN]);

            /// Create an ID by hashing arbitrary data with BLAKE3.
            pub fn from_data(data: &[u8]) -> Self {
                Self(blake3::hash(data).into())
            }

            /// Return the raw 32-byte representation.
            pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
                &self.0
            }
        }

        impl From<[u8; DIGEST_LEN]> for $name {
            fn from(bytes: [u8; DIGEST_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s.trim())
                    .map_err(|e| ParseIdError::InvalidHex(e.to_string()))?;
                let arr: [u8; DIGEST_LEN] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| ParseIdError::InvalidLength(bytes.len()))?;
                Ok(Self(arr))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

define_id!(
    /// A BLAKE3 digest: snapshot digests, tree roots, chain links.
    Digest
);

define_id!(
    /// Stable identity of a directory: the digest of its epoch-0 snapshot.
    ///
    /// Addresses may change over a directory's lifetime; this identity may not.
    DirectoryId
);

impl From<Digest> for DirectoryId {
    fn from(digest: Digest) -> Self {
        Self(*digest.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Status taxonomy
// ---------------------------------------------------------------------------

/// Status codes surfaced outward in protocol responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    /// The request succeeded.
    Ok,
    /// Bad request shape, empty or out-of-order range.
    MalformedMessage,
    /// No history is known for the requested directory.
    UnknownDirectory,
    /// A history for this directory already exists.
    AlreadyExists,
    /// A snapshot failed signature or chain-linkage verification.
    InvalidChain,
    /// Two observers hold divergent snapshots for the same epoch.
    EquivocationDetected,
    /// An authenticated-mapping proof did not verify.
    ProofVerificationFailed,
    /// A verified value differs from the expected one.
    KeyMismatch,
    /// Storage or serialization failure inside the serving component.
    Internal,
}

/// Coarse category of a failure, for callers that branch on severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultClass {
    /// Not a failure.
    None,
    /// The caller sent something malformed; fixing the request fixes it.
    ClientCorrectable,
    /// A valid state the caller can resolve by initializing history.
    UnknownIdentity,
    /// Chain violation or equivocation. Never retried, never auto-healed.
    SecurityFault,
    /// A directory misbehaving on content (or a misused probe).
    ContentMismatch,
    /// Local failure of the serving component; may be retried.
    Internal,
}

impl StatusCode {
    /// Whether this code reports success.
    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }

    /// The fault category this code belongs to.
    pub fn fault_class(self) -> FaultClass {
        match self {
            StatusCode::Ok => FaultClass::None,
            StatusCode::MalformedMessage | StatusCode::AlreadyExists => {
                FaultClass::ClientCorrectable
            }
            StatusCode::UnknownDirectory => FaultClass::UnknownIdentity,
            StatusCode::InvalidChain | StatusCode::EquivocationDetected => {
                FaultClass::SecurityFault
            }
            StatusCode::ProofVerificationFailed | StatusCode::KeyMismatch => {
                FaultClass::ContentMismatch
            }
            StatusCode::Internal => FaultClass::Internal,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusCode::Ok => "ok",
            StatusCode::MalformedMessage => "malformed message",
            StatusCode::UnknownDirectory => "unknown directory",
            StatusCode::AlreadyExists => "already exists",
            StatusCode::InvalidChain => "invalid chain",
            StatusCode::EquivocationDetected => "equivocation detected",
            StatusCode::ProofVerificationFailed => "proof verification failed",
            StatusCode::KeyMismatch => "key mismatch",
            StatusCode::Internal => "internal error",
        };
        f.write_str(s)
    }
}

impl FaultClass {
    /// Security-relevant faults must be reported, never silently retried.
    pub fn is_security_relevant(self) -> bool {
        self == FaultClass::SecurityFault
    }

    /// Whether re-attempting the same operation later may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, FaultClass::UnknownIdentity | FaultClass::Internal)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
