//! Per-stage approval decision records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::export::{ExportId, Organization};
use crate::error::ExportflowError;

/// The kind of decision an organization makes at its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalType {
    EcxVerification,
    EctaLicense,
    EctaQuality,
    EctaContract,
    BankDocument,
    FxApproval,
    CustomsClearance,
    Shipment,
}

impl ApprovalType {
    pub const ALL: &'static [ApprovalType] = &[
        ApprovalType::EcxVerification,
        ApprovalType::EctaLicense,
        ApprovalType::EctaQuality,
        ApprovalType::EctaContract,
        ApprovalType::BankDocument,
        ApprovalType::FxApproval,
        ApprovalType::CustomsClearance,
        ApprovalType::Shipment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalType::EcxVerification => "ECX_VERIFICATION",
            ApprovalType::EctaLicense => "ECTA_LICENSE",
            ApprovalType::EctaQuality => "ECTA_QUALITY",
            ApprovalType::EctaContract => "ECTA_CONTRACT",
            ApprovalType::BankDocument => "BANK_DOCUMENT",
            ApprovalType::FxApproval => "FX_APPROVAL",
            ApprovalType::CustomsClearance => "CUSTOMS_CLEARANCE",
            ApprovalType::Shipment => "SHIPMENT",
        }
    }
}

impl std::str::FromStr for ApprovalType {
    type Err = ExportflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApprovalType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ExportflowError::Validation(format!("unknown approval type: {s}")))
    }
}

impl std::fmt::Display for ApprovalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a stage decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "APPROVED",
            Decision::Rejected => "REJECTED",
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = ExportflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(Decision::Approved),
            "REJECTED" => Ok(Decision::Rejected),
            other => Err(ExportflowError::Validation(format!(
                "unknown decision: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable decision artifact backing an approve/reject transition.
///
/// One row per organization action; an export accumulates several of these
/// (quality, FX, customs, shipment) as it moves through the consortium, and
/// may accumulate more than one of the same type after resubmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    pub id: Uuid,
    pub export_id: ExportId,
    pub approval_type: ApprovalType,
    pub organization: Organization,
    pub decided_by: String,
    pub decision: Decision,
    /// Stage-specific payload fields as submitted with the transition.
    pub data: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}
