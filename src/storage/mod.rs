//! Storage trait for persisting and querying export records.
//!
//! The engine does all validation; storage implementations only need to
//! provide atomic commits and the optimistic-concurrency status check.

use async_trait::async_trait;

use crate::domain::{
    ApprovalRecord, ExportId, ExportRecord, ExportStatus, StatusHistoryEntry,
};
use crate::error::Result;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

/// Everything one committed transition writes, bundled so implementations can
/// commit it in a single transaction.
///
/// `expected_status` is the status the engine validated against. The store
/// must only apply the update while the row still carries that status; a
/// mismatch means another writer got there first and the commit must fail
/// with `ConcurrentModification`.
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    pub expected_status: ExportStatus,
    /// The record with the new status and merged stage fields.
    pub updated: ExportRecord,
    pub history: StatusHistoryEntry,
    /// Present for stage decisions (approve/reject), absent for milestones,
    /// resubmissions and cancellation.
    pub approval: Option<ApprovalRecord>,
}

/// Filter for listing exports.
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub exporter_id: Option<String>,
    pub status: Option<ExportStatus>,
    pub limit: Option<i64>,
}

/// Storage backend for export records, history, and approvals.
#[async_trait]
pub trait ExportStore: Send + Sync {
    /// Insert a freshly submitted record.
    async fn create_export(&self, record: &ExportRecord) -> Result<()>;

    /// Fetch the current record. `NotFound` if it does not exist.
    async fn get_export(&self, id: ExportId) -> Result<ExportRecord>;

    /// List exports, newest first.
    async fn list_exports(&self, filter: ExportFilter) -> Result<Vec<ExportRecord>>;

    /// Atomically apply a validated transition: update the record (guarded by
    /// `expected_status`), append the history entry, and insert the approval
    /// record if present. All writes succeed or none do.
    ///
    /// # Errors
    /// - `ConcurrentModification` if the row's status no longer matches
    ///   `expected_status`
    /// - `NotFound` if the row disappeared (should not happen; rows are never
    ///   deleted)
    async fn commit_transition(&self, commit: &TransitionCommit) -> Result<ExportRecord>;

    /// Ordered status history, oldest first.
    async fn history(&self, id: ExportId) -> Result<Vec<StatusHistoryEntry>>;

    /// All approval records for an export, oldest first.
    async fn approvals(&self, id: ExportId) -> Result<Vec<ApprovalRecord>>;
}
