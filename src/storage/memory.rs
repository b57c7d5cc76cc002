//! In-memory implementation of [`ExportStore`].
//!
//! Used by tests and by embedders that want the engine without a database.
//! Semantics mirror the Postgres store, including the optimistic-concurrency
//! check on commit.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{ApprovalRecord, ExportId, ExportRecord, StatusHistoryEntry};
use crate::error::{ExportflowError, Result};

use super::{ExportFilter, ExportStore, TransitionCommit};

#[derive(Default)]
struct Tables {
    exports: HashMap<ExportId, ExportRecord>,
    history: Vec<StatusHistoryEntry>,
    approvals: Vec<ApprovalRecord>,
}

/// Thread-safe in-memory export store.
#[derive(Default)]
pub struct InMemoryExportStore {
    tables: RwLock<Tables>,
}

impl InMemoryExportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExportStore for InMemoryExportStore {
    async fn create_export(&self, record: &ExportRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.exports.contains_key(&record.id) {
            return Err(ExportflowError::Validation(format!(
                "export {} already exists",
                record.id
            )));
        }
        tables.exports.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_export(&self, id: ExportId) -> Result<ExportRecord> {
        let tables = self.tables.read().await;
        tables
            .exports
            .get(&id)
            .cloned()
            .ok_or(ExportflowError::NotFound(id))
    }

    async fn list_exports(&self, filter: ExportFilter) -> Result<Vec<ExportRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<_> = tables
            .exports
            .values()
            .filter(|r| {
                filter
                    .exporter_id
                    .as_deref()
                    .map_or(true, |id| r.exporter_id == id)
            })
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            records.truncate(limit.max(0) as usize);
        }
        Ok(records)
    }

    async fn commit_transition(&self, commit: &TransitionCommit) -> Result<ExportRecord> {
        // Single write lock for the whole read-check-write sequence, the
        // in-memory analogue of one database transaction.
        let mut tables = self.tables.write().await;

        let current = tables
            .exports
            .get(&commit.updated.id)
            .ok_or(ExportflowError::NotFound(commit.updated.id))?;
        if current.status != commit.expected_status {
            return Err(ExportflowError::ConcurrentModification(commit.updated.id));
        }

        tables
            .exports
            .insert(commit.updated.id, commit.updated.clone());
        tables.history.push(commit.history.clone());
        if let Some(approval) = &commit.approval {
            tables.approvals.push(approval.clone());
        }

        Ok(commit.updated.clone())
    }

    async fn history(&self, id: ExportId) -> Result<Vec<StatusHistoryEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<_> = tables
            .history
            .iter()
            .filter(|e| e.export_id == id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(entries)
    }

    async fn approvals(&self, id: ExportId) -> Result<Vec<ApprovalRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<_> = tables
            .approvals
            .iter()
            .filter(|a| a.export_id == id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(records)
    }
}
