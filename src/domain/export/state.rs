//! Core types for the export workflow.
//!
//! An export record moves through a long, branching sequence of statuses as
//! each consortium organization approves or rejects it in turn. The status
//! enum here is the canonical enumeration; the allowed edges between statuses
//! live in [`super::transitions`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ExportflowError, Result};

/// Unique identifier for an export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportId(pub Uuid);

impl ExportId {
    pub fn new() -> Self {
        ExportId(Uuid::new_v4())
    }
}

impl Default for ExportId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display only first 8 characters for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for ExportId {
    fn from(uuid: Uuid) -> Self {
        ExportId(uuid)
    }
}

impl std::ops::Deref for ExportId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Canonical status enumeration for an export record.
///
/// Statuses serialize (and persist) as SCREAMING_SNAKE_CASE strings, e.g.
/// `ECX_VERIFIED`. Rejected statuses are dead ends unless the exporter
/// resubmits; only `COMPLETED` and `CANCELLED` are truly terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    Pending,
    EcxVerified,
    EcxRejected,
    EctaLicenseApproved,
    EctaLicenseRejected,
    EctaQualityApproved,
    EctaQualityRejected,
    EctaContractApproved,
    EctaContractRejected,
    BankDocumentVerified,
    BankDocumentRejected,
    FxApproved,
    FxRejected,
    CustomsCleared,
    CustomsRejected,
    ShipmentScheduled,
    Shipped,
    Arrived,
    Delivered,
    Completed,
    Cancelled,
}

impl ExportStatus {
    /// All statuses, in workflow order. Used for table-completeness checks.
    pub const ALL: &'static [ExportStatus] = &[
        ExportStatus::Pending,
        ExportStatus::EcxVerified,
        ExportStatus::EcxRejected,
        ExportStatus::EctaLicenseApproved,
        ExportStatus::EctaLicenseRejected,
        ExportStatus::EctaQualityApproved,
        ExportStatus::EctaQualityRejected,
        ExportStatus::EctaContractApproved,
        ExportStatus::EctaContractRejected,
        ExportStatus::BankDocumentVerified,
        ExportStatus::BankDocumentRejected,
        ExportStatus::FxApproved,
        ExportStatus::FxRejected,
        ExportStatus::CustomsCleared,
        ExportStatus::CustomsRejected,
        ExportStatus::ShipmentScheduled,
        ExportStatus::Shipped,
        ExportStatus::Arrived,
        ExportStatus::Delivered,
        ExportStatus::Completed,
        ExportStatus::Cancelled,
    ];

    /// String form stored in the database `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Pending => "PENDING",
            ExportStatus::EcxVerified => "ECX_VERIFIED",
            ExportStatus::EcxRejected => "ECX_REJECTED",
            ExportStatus::EctaLicenseApproved => "ECTA_LICENSE_APPROVED",
            ExportStatus::EctaLicenseRejected => "ECTA_LICENSE_REJECTED",
            ExportStatus::EctaQualityApproved => "ECTA_QUALITY_APPROVED",
            ExportStatus::EctaQualityRejected => "ECTA_QUALITY_REJECTED",
            ExportStatus::EctaContractApproved => "ECTA_CONTRACT_APPROVED",
            ExportStatus::EctaContractRejected => "ECTA_CONTRACT_REJECTED",
            ExportStatus::BankDocumentVerified => "BANK_DOCUMENT_VERIFIED",
            ExportStatus::BankDocumentRejected => "BANK_DOCUMENT_REJECTED",
            ExportStatus::FxApproved => "FX_APPROVED",
            ExportStatus::FxRejected => "FX_REJECTED",
            ExportStatus::CustomsCleared => "CUSTOMS_CLEARED",
            ExportStatus::CustomsRejected => "CUSTOMS_REJECTED",
            ExportStatus::ShipmentScheduled => "SHIPMENT_SCHEDULED",
            ExportStatus::Shipped => "SHIPPED",
            ExportStatus::Arrived => "ARRIVED",
            ExportStatus::Delivered => "DELIVERED",
            ExportStatus::Completed => "COMPLETED",
            ExportStatus::Cancelled => "CANCELLED",
        }
    }

    /// Truly terminal: no outgoing edges, not even resubmission or cancellation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Completed | ExportStatus::Cancelled)
    }

    /// Rejected stage gate the exporter can resubmit past, if any.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            ExportStatus::EcxRejected
                | ExportStatus::EctaLicenseRejected
                | ExportStatus::EctaQualityRejected
                | ExportStatus::EctaContractRejected
                | ExportStatus::BankDocumentRejected
                | ExportStatus::FxRejected
                | ExportStatus::CustomsRejected
        )
    }
}

impl std::str::FromStr for ExportStatus {
    type Err = ExportflowError;

    fn from_str(s: &str) -> Result<Self> {
        ExportStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ExportflowError::Validation(format!("unknown export status: {s}")))
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consortium organizations that act on an export record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Organization {
    Ecx,
    Ecta,
    CommercialBank,
    NationalBank,
    Customs,
    ShippingLine,
    Exporter,
}

impl Organization {
    pub const ALL: &'static [Organization] = &[
        Organization::Ecx,
        Organization::Ecta,
        Organization::CommercialBank,
        Organization::NationalBank,
        Organization::Customs,
        Organization::ShippingLine,
        Organization::Exporter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Organization::Ecx => "ECX",
            Organization::Ecta => "ECTA",
            Organization::CommercialBank => "COMMERCIAL_BANK",
            Organization::NationalBank => "NATIONAL_BANK",
            Organization::Customs => "CUSTOMS",
            Organization::ShippingLine => "SHIPPING_LINE",
            Organization::Exporter => "EXPORTER",
        }
    }
}

impl std::str::FromStr for Organization {
    type Err = ExportflowError;

    fn from_str(s: &str) -> Result<Self> {
        Organization::ALL
            .iter()
            .copied()
            .find(|org| org.as_str() == s)
            .ok_or_else(|| ExportflowError::Validation(format!("unknown organization: {s}")))
    }
}

impl std::fmt::Display for Organization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity attempting a workflow action.
///
/// Identity and role claims come from the external auth middleware; the
/// engine trusts them and only checks them against the permission table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user identifier from the auth layer (recorded in history).
    pub id: String,
    /// Organization the actor belongs to.
    pub organization: Organization,
    /// Administrators may cancel exports they do not own.
    #[serde(default)]
    pub admin: bool,
}

impl Actor {
    pub fn new(id: impl Into<String>, organization: Organization) -> Self {
        Actor {
            id: id.into(),
            organization,
            admin: false,
        }
    }

    pub fn admin(id: impl Into<String>, organization: Organization) -> Self {
        Actor {
            id: id.into(),
            organization,
            admin: true,
        }
    }
}

/// One export shipment tracked end-to-end through the consortium.
///
/// Stage fields start empty and accumulate as the record advances; each is
/// only written by the edge owned by the corresponding organization.
/// Records are never physically deleted; cancellation is a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub id: ExportId,
    pub exporter_id: String,
    pub exporter_name: String,
    pub coffee_type: String,
    pub quantity_kg: f64,
    pub destination_country: String,
    pub estimated_value_usd: f64,
    pub status: ExportStatus,

    // Stage fields
    pub ecx_lot_number: Option<String>,
    pub export_license_number: Option<String>,
    pub quality_grade: Option<String>,
    pub contract_number: Option<String>,
    pub bank_document_reference: Option<String>,
    pub fx_approval_id: Option<String>,
    pub customs_declaration_number: Option<String>,
    pub vessel_name: Option<String>,
    pub departure_date: Option<DateTime<Utc>>,
    pub arrival_date: Option<DateTime<Utc>>,

    // Per-stage rejection reasons, cleared on resubmission
    pub ecx_rejection_reason: Option<String>,
    pub ecta_license_rejection_reason: Option<String>,
    pub ecta_quality_rejection_reason: Option<String>,
    pub ecta_contract_rejection_reason: Option<String>,
    pub bank_document_rejection_reason: Option<String>,
    pub fx_rejection_reason: Option<String>,
    pub customs_rejection_reason: Option<String>,

    pub cancellation_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Exporter-supplied data for a new export submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExport {
    pub exporter_id: String,
    pub exporter_name: String,
    pub coffee_type: String,
    pub quantity_kg: f64,
    pub destination_country: String,
    pub estimated_value_usd: f64,
}

impl NewExport {
    /// Validate submission data before a record is created.
    pub fn validate(&self) -> Result<()> {
        if self.exporter_id.trim().is_empty() {
            return Err(ExportflowError::Validation(
                "exporterId must not be empty".to_string(),
            ));
        }
        if self.exporter_name.trim().is_empty() {
            return Err(ExportflowError::Validation(
                "exporterName must not be empty".to_string(),
            ));
        }
        if self.coffee_type.trim().is_empty() {
            return Err(ExportflowError::Validation(
                "coffeeType must not be empty".to_string(),
            ));
        }
        if self.destination_country.trim().is_empty() {
            return Err(ExportflowError::Validation(
                "destinationCountry must not be empty".to_string(),
            ));
        }
        if !self.quantity_kg.is_finite() || self.quantity_kg <= 0.0 {
            return Err(ExportflowError::Validation(
                "quantityKg must be a positive number".to_string(),
            ));
        }
        if !self.estimated_value_usd.is_finite() || self.estimated_value_usd < 0.0 {
            return Err(ExportflowError::Validation(
                "estimatedValueUsd must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    /// Materialize a PENDING record from the submission.
    pub fn into_record(self, id: ExportId, now: DateTime<Utc>) -> ExportRecord {
        ExportRecord {
            id,
            exporter_id: self.exporter_id,
            exporter_name: self.exporter_name,
            coffee_type: self.coffee_type,
            quantity_kg: self.quantity_kg,
            destination_country: self.destination_country,
            estimated_value_usd: self.estimated_value_usd,
            status: ExportStatus::Pending,
            ecx_lot_number: None,
            export_license_number: None,
            quality_grade: None,
            contract_number: None,
            bank_document_reference: None,
            fx_approval_id: None,
            customs_declaration_number: None,
            vessel_name: None,
            departure_date: None,
            arrival_date: None,
            ecx_rejection_reason: None,
            ecta_license_rejection_reason: None,
            ecta_quality_rejection_reason: None,
            ecta_contract_rejection_reason: None,
            bank_document_rejection_reason: None,
            fx_rejection_reason: None,
            customs_rejection_reason: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_string() {
        for status in ExportStatus::ALL {
            let parsed: ExportStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, *status);
        }
    }

    #[test]
    fn status_serde_matches_db_string() {
        for status in ExportStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn organization_round_trips() {
        for org in Organization::ALL {
            let parsed: Organization = org.as_str().parse().unwrap();
            assert_eq!(parsed, *org);
        }
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let err = "QUALITY_CERTIFIED".parse::<ExportStatus>().unwrap_err();
        assert!(matches!(err, ExportflowError::Validation(_)));
    }

    #[test]
    fn new_export_validation_rejects_bad_quantity() {
        let export = NewExport {
            exporter_id: "exp-1".to_string(),
            exporter_name: "Sidamo Coop".to_string(),
            coffee_type: "Arabica".to_string(),
            quantity_kg: 0.0,
            destination_country: "DE".to_string(),
            estimated_value_usd: 10_000.0,
        };
        assert!(export.validate().is_err());
    }
}
