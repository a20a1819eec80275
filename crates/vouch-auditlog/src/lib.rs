//! Auditor-side mirror of many directories' snapshot histories.
//!
//! An [`AuditLog`] indexes one [`DirectoryHistory`] per directory by its
//! [`DirectoryId`](vouch_types::DirectoryId). Every snapshot enters through
//! chain admission; range queries only ever return admitted snapshots.
//!
//! Histories can be persisted in a [`HistoryStore`] (Fjall on disk, or pure
//! in-memory) and are re-validated from epoch 0 when the log is reopened.

mod error;
mod history;
mod log;
mod store;

pub use error::AuditLogError;
pub use history::DirectoryHistory;
pub use log::{AuditLog, DirectorySummary};
pub use store::{DirectoryRecord, HistoryStore};
