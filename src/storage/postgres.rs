//! PostgreSQL implementation of [`ExportStore`].
//!
//! The commit path runs the status update, the history insert, and the
//! approval insert in one transaction, with the optimistic-concurrency check
//! expressed as `WHERE status = $expected` on the update. A `pg_notify` in
//! the same transaction lets downstream consumers (notification delivery,
//! dashboards) follow committed transitions via LISTEN.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::{
    ApprovalRecord, ExportId, ExportRecord, StatusHistoryEntry,
};
use crate::error::{ExportflowError, Result};

use super::{ExportFilter, ExportStore, TransitionCommit};

/// Channel used for transition notifications.
pub const NOTIFY_CHANNEL: &str = "export_transitions";

/// PostgreSQL-backed export store.
///
/// # Example
/// ```ignore
/// use exportflow::PostgresExportStore;
/// use sqlx::PgPool;
///
/// let pool = PgPool::connect("postgresql://localhost/exportflow").await?;
/// exportflow::migrator().run(&pool).await?;
/// let store = PostgresExportStore::new(pool);
/// ```
pub struct PostgresExportStore {
    pool: PgPool,
}

impl PostgresExportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a listener for committed transitions.
    ///
    /// The listener receives one notification per committed transition on
    /// [`NOTIFY_CHANNEL`], with a JSON payload of
    /// `{exportId, oldStatus, newStatus, organization}`.
    pub async fn create_listener(&self) -> Result<PgListener> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| ExportflowError::Other(anyhow!("Failed to create listener: {}", e)))?;
        listener
            .listen(NOTIFY_CHANNEL)
            .await
            .map_err(|e| ExportflowError::Other(anyhow!("Failed to listen: {}", e)))?;
        Ok(listener)
    }
}

fn row_to_export(row: &PgRow) -> Result<ExportRecord> {
    let status: String = row.try_get("status").map_err(map_db_err)?;
    Ok(ExportRecord {
        id: ExportId(row.try_get::<Uuid, _>("id").map_err(map_db_err)?),
        exporter_id: row.try_get("exporter_id").map_err(map_db_err)?,
        exporter_name: row.try_get("exporter_name").map_err(map_db_err)?,
        coffee_type: row.try_get("coffee_type").map_err(map_db_err)?,
        quantity_kg: row.try_get("quantity_kg").map_err(map_db_err)?,
        destination_country: row.try_get("destination_country").map_err(map_db_err)?,
        estimated_value_usd: row.try_get("estimated_value_usd").map_err(map_db_err)?,
        status: status.parse()?,
        ecx_lot_number: row.try_get("ecx_lot_number").map_err(map_db_err)?,
        export_license_number: row.try_get("export_license_number").map_err(map_db_err)?,
        quality_grade: row.try_get("quality_grade").map_err(map_db_err)?,
        contract_number: row.try_get("contract_number").map_err(map_db_err)?,
        bank_document_reference: row.try_get("bank_document_reference").map_err(map_db_err)?,
        fx_approval_id: row.try_get("fx_approval_id").map_err(map_db_err)?,
        customs_declaration_number: row
            .try_get("customs_declaration_number")
            .map_err(map_db_err)?,
        vessel_name: row.try_get("vessel_name").map_err(map_db_err)?,
        departure_date: row.try_get("departure_date").map_err(map_db_err)?,
        arrival_date: row.try_get("arrival_date").map_err(map_db_err)?,
        ecx_rejection_reason: row.try_get("ecx_rejection_reason").map_err(map_db_err)?,
        ecta_license_rejection_reason: row
            .try_get("ecta_license_rejection_reason")
            .map_err(map_db_err)?,
        ecta_quality_rejection_reason: row
            .try_get("ecta_quality_rejection_reason")
            .map_err(map_db_err)?,
        ecta_contract_rejection_reason: row
            .try_get("ecta_contract_rejection_reason")
            .map_err(map_db_err)?,
        bank_document_rejection_reason: row
            .try_get("bank_document_rejection_reason")
            .map_err(map_db_err)?,
        fx_rejection_reason: row.try_get("fx_rejection_reason").map_err(map_db_err)?,
        customs_rejection_reason: row
            .try_get("customs_rejection_reason")
            .map_err(map_db_err)?,
        cancellation_reason: row.try_get("cancellation_reason").map_err(map_db_err)?,
        created_at: row.try_get("created_at").map_err(map_db_err)?,
        updated_at: row.try_get("updated_at").map_err(map_db_err)?,
    })
}

fn row_to_history(row: &PgRow) -> Result<StatusHistoryEntry> {
    let old_status: String = row.try_get("old_status").map_err(map_db_err)?;
    let new_status: String = row.try_get("new_status").map_err(map_db_err)?;
    let organization: String = row.try_get("organization").map_err(map_db_err)?;
    Ok(StatusHistoryEntry {
        id: row.try_get("id").map_err(map_db_err)?,
        export_id: ExportId(row.try_get::<Uuid, _>("export_id").map_err(map_db_err)?),
        old_status: old_status.parse()?,
        new_status: new_status.parse()?,
        changed_by: row.try_get("changed_by").map_err(map_db_err)?,
        organization: organization.parse()?,
        reason: row.try_get("reason").map_err(map_db_err)?,
        recorded_at: row.try_get("recorded_at").map_err(map_db_err)?,
    })
}

fn row_to_approval(row: &PgRow) -> Result<ApprovalRecord> {
    let approval_type: String = row.try_get("approval_type").map_err(map_db_err)?;
    let organization: String = row.try_get("organization").map_err(map_db_err)?;
    let decision: String = row.try_get("decision").map_err(map_db_err)?;
    Ok(ApprovalRecord {
        id: row.try_get("id").map_err(map_db_err)?,
        export_id: ExportId(row.try_get::<Uuid, _>("export_id").map_err(map_db_err)?),
        approval_type: approval_type.parse()?,
        organization: organization.parse()?,
        decided_by: row.try_get("decided_by").map_err(map_db_err)?,
        decision: decision.parse()?,
        data: row.try_get("data").map_err(map_db_err)?,
        recorded_at: row.try_get("recorded_at").map_err(map_db_err)?,
    })
}

fn map_db_err(e: sqlx::Error) -> ExportflowError {
    ExportflowError::Other(anyhow!("Database error: {}", e))
}

#[async_trait]
impl ExportStore for PostgresExportStore {
    async fn create_export(&self, record: &ExportRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exports (
                id, exporter_id, exporter_name, coffee_type, quantity_kg,
                destination_country, estimated_value_usd, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id.0)
        .bind(&record.exporter_id)
        .bind(&record.exporter_name)
        .bind(&record.coffee_type)
        .bind(record.quantity_kg)
        .bind(&record.destination_country)
        .bind(record.estimated_value_usd)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_export(&self, id: ExportId) -> Result<ExportRecord> {
        let row = sqlx::query("SELECT * FROM exports WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?
            .ok_or(ExportflowError::NotFound(id))?;
        row_to_export(&row)
    }

    async fn list_exports(&self, filter: ExportFilter) -> Result<Vec<ExportRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM exports
            WHERE ($1::TEXT IS NULL OR exporter_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(filter.exporter_id)
        .bind(filter.status.map(|s| s.as_str()))
        // Negative limits come straight from the query string; clamp rather
        // than let Postgres reject the statement
        .bind(filter.limit.unwrap_or(100).max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter().map(row_to_export).collect()
    }

    async fn commit_transition(&self, commit: &TransitionCommit) -> Result<ExportRecord> {
        let updated = &commit.updated;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ExportflowError::Other(anyhow!("Failed to begin transaction: {}", e)))?;

        // Optimistic concurrency: only update while the row still carries
        // the status the engine validated against.
        let rows_affected = sqlx::query(
            r#"
            UPDATE exports
            SET
                status = $3,
                ecx_lot_number = $4,
                export_license_number = $5,
                quality_grade = $6,
                contract_number = $7,
                bank_document_reference = $8,
                fx_approval_id = $9,
                customs_declaration_number = $10,
                vessel_name = $11,
                departure_date = $12,
                arrival_date = $13,
                ecx_rejection_reason = $14,
                ecta_license_rejection_reason = $15,
                ecta_quality_rejection_reason = $16,
                ecta_contract_rejection_reason = $17,
                bank_document_rejection_reason = $18,
                fx_rejection_reason = $19,
                customs_rejection_reason = $20,
                cancellation_reason = $21,
                updated_at = $22
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(updated.id.0)
        .bind(commit.expected_status.as_str())
        .bind(updated.status.as_str())
        .bind(&updated.ecx_lot_number)
        .bind(&updated.export_license_number)
        .bind(&updated.quality_grade)
        .bind(&updated.contract_number)
        .bind(&updated.bank_document_reference)
        .bind(&updated.fx_approval_id)
        .bind(&updated.customs_declaration_number)
        .bind(&updated.vessel_name)
        .bind(updated.departure_date)
        .bind(updated.arrival_date)
        .bind(&updated.ecx_rejection_reason)
        .bind(&updated.ecta_license_rejection_reason)
        .bind(&updated.ecta_quality_rejection_reason)
        .bind(&updated.ecta_contract_rejection_reason)
        .bind(&updated.bank_document_rejection_reason)
        .bind(&updated.fx_rejection_reason)
        .bind(&updated.customs_rejection_reason)
        .bind(&updated.cancellation_reason)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?
        .rows_affected();

        if rows_affected == 0 {
            tx.rollback()
                .await
                .map_err(|e| ExportflowError::Other(anyhow!("Failed to rollback: {}", e)))?;
            // Distinguish a vanished row from a stale status
            let exists: Option<PgRow> = sqlx::query("SELECT 1 FROM exports WHERE id = $1")
                .bind(updated.id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_err)?;
            return if exists.is_some() {
                Err(ExportflowError::ConcurrentModification(updated.id))
            } else {
                Err(ExportflowError::NotFound(updated.id))
            };
        }

        let history = &commit.history;
        sqlx::query(
            r#"
            INSERT INTO export_status_history (
                id, export_id, old_status, new_status, changed_by,
                organization, reason, recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(history.id)
        .bind(history.export_id.0)
        .bind(history.old_status.as_str())
        .bind(history.new_status.as_str())
        .bind(&history.changed_by)
        .bind(history.organization.as_str())
        .bind(&history.reason)
        .bind(history.recorded_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        if let Some(approval) = &commit.approval {
            sqlx::query(
                r#"
                INSERT INTO export_approvals (
                    id, export_id, approval_type, organization, decided_by,
                    decision, data, recorded_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(approval.id)
            .bind(approval.export_id.0)
            .bind(approval.approval_type.as_str())
            .bind(approval.organization.as_str())
            .bind(&approval.decided_by)
            .bind(approval.decision.as_str())
            .bind(&approval.data)
            .bind(approval.recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        }

        // Notify in the same transaction so listeners only ever see
        // committed transitions.
        let notification = serde_json::json!({
            "exportId": updated.id.0,
            "oldStatus": history.old_status,
            "newStatus": history.new_status,
            "organization": history.organization,
        });
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(NOTIFY_CHANNEL)
            .bind(notification.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        tx.commit()
            .await
            .map_err(|e| ExportflowError::Other(anyhow!("Failed to commit transaction: {}", e)))?;

        Ok(updated.clone())
    }

    async fn history(&self, id: ExportId) -> Result<Vec<StatusHistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM export_status_history
            WHERE export_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter().map(row_to_history).collect()
    }

    async fn approvals(&self, id: ExportId) -> Result<Vec<ApprovalRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM export_approvals
            WHERE export_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter().map(row_to_approval).collect()
    }
}
