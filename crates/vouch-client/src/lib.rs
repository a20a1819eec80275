//! Client-side consistency checking for key-transparency directories.
//!
//! A [`ConsistencyChecker`] follows one directory for one client session. It
//! admits every snapshot the directory shows it through the same chain rules
//! auditors use, checks mapping proofs against those snapshots, tracks
//! registration promises, and cross-checks its own observations against an
//! auditor's history to detect equivocation.

mod checker;
mod error;

pub use checker::{CheckerState, ConsistencyChecker};
pub use error::CheckError;
