//! Append-only status history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::export::{ExportId, ExportStatus, Organization};

/// One committed transition, recorded for audit.
///
/// History rows are written in the same transaction as the status change and
/// are never updated or deleted afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub export_id: ExportId,
    pub old_status: ExportStatus,
    pub new_status: ExportStatus,
    /// Actor id from the auth layer.
    pub changed_by: String,
    pub organization: Organization,
    /// Rejection or cancellation reason, when the edge carries one.
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
