//! The status transition engine.
//!
//! Accepts `(exportId, targetStatus, actor, payload)` and either commits the
//! new status atomically (record update + history entry + approval record in
//! one transaction) or rejects with a typed error. Validation happens here,
//! against a freshly fetched record; the storage layer only enforces the
//! optimistic-concurrency check at commit time.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::export::transitions::{self, ResolvedTransition};
use crate::domain::{
    gatekeeper, Actor, ApprovalRecord, ExportId, ExportRecord, ExportStatus, NewExport,
    StatusHistoryEntry, TransitionPayload,
};
use crate::error::{ExportflowError, Result};
use crate::metrics;
use crate::storage::{ExportFilter, ExportStore, TransitionCommit};

/// One transition attempt.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub export_id: ExportId,
    pub target_status: ExportStatus,
    pub actor: Actor,
    pub payload: TransitionPayload,
}

/// Merged view of a record with its full audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub export: ExportRecord,
    pub history: Vec<StatusHistoryEntry>,
    pub approvals: Vec<ApprovalRecord>,
}

/// The workflow engine. Generic over the storage backend; all validation
/// logic lives here and is identical for Postgres and in-memory stores.
pub struct TransitionEngine<S: ExportStore + ?Sized> {
    store: Arc<S>,
}

impl<S: ExportStore + ?Sized> Clone for TransitionEngine<S> {
    fn clone(&self) -> Self {
        TransitionEngine {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ExportStore + ?Sized> TransitionEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a new export in PENDING. Exporters only.
    #[tracing::instrument(skip(self, new_export), fields(exporter_id = %new_export.exporter_id))]
    pub async fn submit(&self, new_export: NewExport, actor: &Actor) -> Result<ExportRecord> {
        if !gatekeeper::is_allowed(actor.organization, gatekeeper::ActionKind::SubmitExport) {
            return Err(ExportflowError::Unauthorized {
                organization: actor.organization,
                action: gatekeeper::ActionKind::SubmitExport.as_str(),
            });
        }
        new_export.validate()?;

        let record = new_export.into_record(ExportId::new(), Utc::now());
        self.store.create_export(&record).await?;
        metrics::record_submission();
        tracing::info!(
            export_id = %record.id,
            coffee_type = %record.coffee_type,
            destination = %record.destination_country,
            "Export submitted"
        );
        Ok(record)
    }

    /// Validate and commit one status transition.
    ///
    /// Validation order: edge lookup, authorization, payload completeness.
    /// The commit is a single storage transaction guarded by the status the
    /// record carried when it was fetched; a concurrent writer surfaces as
    /// `ConcurrentModification` and is never retried here.
    #[tracing::instrument(
        skip(self, request),
        fields(
            export_id = %request.export_id,
            target = %request.target_status,
            organization = %request.actor.organization,
        )
    )]
    pub async fn transition(&self, request: TransitionRequest) -> Result<ExportRecord> {
        let result = self.try_transition(&request).await;
        match &result {
            Ok(record) => {
                metrics::record_transition(record.status, request.actor.organization);
                tracing::info!(
                    export_id = %record.id,
                    new_status = %record.status,
                    "Transition committed"
                );
            }
            Err(e) => {
                metrics::record_denied(e.kind(), request.actor.organization);
                tracing::warn!(
                    export_id = %request.export_id,
                    target = %request.target_status,
                    error = %e,
                    "Transition denied"
                );
            }
        }
        result
    }

    async fn try_transition(&self, request: &TransitionRequest) -> Result<ExportRecord> {
        let record = self.store.get_export(request.export_id).await?;

        let resolved = transitions::resolve(record.status, request.target_status).ok_or(
            ExportflowError::InvalidTransition {
                id: record.id,
                from: record.status,
                to: request.target_status,
            },
        )?;

        self.authorize(&resolved, &request.actor, &record)?;
        transitions::check_payload(&resolved, &request.payload)?;

        let now = Utc::now();
        let mut updated = record.clone();
        transitions::apply(&mut updated, &resolved, &request.payload, now);

        let history = StatusHistoryEntry {
            id: Uuid::new_v4(),
            export_id: record.id,
            old_status: record.status,
            new_status: updated.status,
            changed_by: request.actor.id.clone(),
            organization: request.actor.organization,
            reason: request.payload.reason.clone(),
            recorded_at: now,
        };

        let approval = match resolved.approval() {
            Some((approval_type, decision)) => Some(ApprovalRecord {
                id: Uuid::new_v4(),
                export_id: record.id,
                approval_type,
                organization: request.actor.organization,
                decided_by: request.actor.id.clone(),
                decision,
                data: request.payload.to_data()?,
                recorded_at: now,
            }),
            None => None,
        };

        self.store
            .commit_transition(&TransitionCommit {
                expected_status: record.status,
                updated,
                history,
                approval,
            })
            .await
    }

    fn authorize(
        &self,
        resolved: &ResolvedTransition,
        actor: &Actor,
        record: &ExportRecord,
    ) -> Result<()> {
        let action = resolved.action();
        let allowed = match resolved {
            ResolvedTransition::Cancel => gatekeeper::may_cancel(actor, record),
            ResolvedTransition::Edge(_) => {
                // Owner-scoped exporter actions (resubmit, receipt
                // confirmation) only apply to the actor's own export.
                gatekeeper::is_allowed(actor.organization, action)
                    && (!gatekeeper::is_owner_scoped(action)
                        || gatekeeper::owns_export(actor, record))
            }
        };
        if !allowed {
            return Err(ExportflowError::Unauthorized {
                organization: actor.organization,
                action: action.as_str(),
            });
        }
        Ok(())
    }

    /// Current record.
    pub async fn get(&self, id: ExportId) -> Result<ExportRecord> {
        self.store.get_export(id).await
    }

    /// List exports, newest first.
    pub async fn list(&self, filter: ExportFilter) -> Result<Vec<ExportRecord>> {
        self.store.list_exports(filter).await
    }

    /// Ordered status history, oldest first.
    pub async fn history(&self, id: ExportId) -> Result<Vec<StatusHistoryEntry>> {
        // Verify the export exists so a bad id is a 404, not an empty list
        self.store.get_export(id).await?;
        self.store.history(id).await
    }

    /// All approval records, oldest first.
    pub async fn approvals(&self, id: ExportId) -> Result<Vec<ApprovalRecord>> {
        self.store.get_export(id).await?;
        self.store.approvals(id).await
    }

    /// Record plus history plus approvals in one view.
    pub async fn summary(&self, id: ExportId) -> Result<ExportSummary> {
        let export = self.store.get_export(id).await?;
        let history = self.store.history(id).await?;
        let approvals = self.store.approvals(id).await?;
        Ok(ExportSummary {
            export,
            history,
            approvals,
        })
    }
}
