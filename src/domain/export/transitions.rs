//! The allowed-edge table for the export workflow.
//!
//! Every legal status change is one of:
//! - a table edge (approve, reject, milestone, receipt confirmation,
//!   resubmission), described as data in [`EDGES`], or
//! - cancellation, which is legal from any non-terminal status and therefore
//!   resolved structurally rather than enumerated.
//!
//! The condensed state machine:
//!
//! ```text
//! PENDING ──[ECX]──> ECX_VERIFIED | ECX_REJECTED
//! ECX_VERIFIED ──[ECTA]──> ECTA_LICENSE_APPROVED | ECTA_LICENSE_REJECTED
//! ECTA_LICENSE_APPROVED ──[ECTA]──> ECTA_QUALITY_APPROVED | ECTA_QUALITY_REJECTED
//! ECTA_QUALITY_APPROVED ──[ECTA]──> ECTA_CONTRACT_APPROVED | ECTA_CONTRACT_REJECTED
//! ECTA_CONTRACT_APPROVED ──[Commercial Bank]──> BANK_DOCUMENT_VERIFIED | BANK_DOCUMENT_REJECTED
//! BANK_DOCUMENT_VERIFIED ──[National Bank]──> FX_APPROVED | FX_REJECTED
//! FX_APPROVED ──[Customs]──> CUSTOMS_CLEARED | CUSTOMS_REJECTED
//! CUSTOMS_CLEARED ──[Shipping Line]──> SHIPMENT_SCHEDULED ──> SHIPPED ──> ARRIVED ──> DELIVERED
//! DELIVERED ──[Exporter]──> COMPLETED
//!
//! *_REJECTED ──[Exporter resubmit]──> (state the rejected stage is entered from)
//! any non-terminal ──[Exporter/admin]──> CANCELLED
//! ```
//!
//! Validation order in the engine: edge lookup, then authorization, then
//! payload completeness. The table itself carries the per-edge required
//! payload fields and the approval record each decision produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::approval::{ApprovalType, Decision};
use crate::domain::gatekeeper::ActionKind;
use crate::error::{ExportflowError, Result};

use super::state::{ExportRecord, ExportStatus};

/// Stage-specific data submitted with a transition.
///
/// All fields are optional at the type level; the edge being attempted
/// determines which are required. Unknown extra fields are rejected at the
/// HTTP boundary by serde.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransitionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx_approval_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vessel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<DateTime<Utc>>,
    /// Rejection or cancellation reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TransitionPayload {
    pub fn with_reason(reason: impl Into<String>) -> Self {
        TransitionPayload {
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Payload as a JSON object, for the approval record's `data` column.
    pub fn to_data(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Payload fields an edge can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadField {
    LotNumber,
    LicenseNumber,
    QualityGrade,
    ContractNumber,
    DocumentReference,
    FxApprovalId,
    DeclarationNumber,
    VesselName,
    DepartureDate,
    ArrivalDate,
    Reason,
}

impl PayloadField {
    /// Wire name, matching the camelCase payload keys.
    pub fn name(&self) -> &'static str {
        match self {
            PayloadField::LotNumber => "lotNumber",
            PayloadField::LicenseNumber => "licenseNumber",
            PayloadField::QualityGrade => "qualityGrade",
            PayloadField::ContractNumber => "contractNumber",
            PayloadField::DocumentReference => "documentReference",
            PayloadField::FxApprovalId => "fxApprovalId",
            PayloadField::DeclarationNumber => "declarationNumber",
            PayloadField::VesselName => "vesselName",
            PayloadField::DepartureDate => "departureDate",
            PayloadField::ArrivalDate => "arrivalDate",
            PayloadField::Reason => "reason",
        }
    }

    fn is_present(&self, payload: &TransitionPayload) -> bool {
        fn some_text(field: &Option<String>) -> bool {
            field.as_deref().is_some_and(|s| !s.trim().is_empty())
        }
        match self {
            PayloadField::LotNumber => some_text(&payload.lot_number),
            PayloadField::LicenseNumber => some_text(&payload.license_number),
            PayloadField::QualityGrade => some_text(&payload.quality_grade),
            PayloadField::ContractNumber => some_text(&payload.contract_number),
            PayloadField::DocumentReference => some_text(&payload.document_reference),
            PayloadField::FxApprovalId => some_text(&payload.fx_approval_id),
            PayloadField::DeclarationNumber => some_text(&payload.declaration_number),
            PayloadField::VesselName => some_text(&payload.vessel_name),
            PayloadField::DepartureDate => payload.departure_date.is_some(),
            PayloadField::ArrivalDate => payload.arrival_date.is_some(),
            PayloadField::Reason => some_text(&payload.reason),
        }
    }
}

/// What an edge does to the record beyond changing the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Organization approves its stage; merges stage fields.
    Approve,
    /// Organization rejects its stage; sets the stage's rejection reason.
    Reject,
    /// Shipping progress update; may merge stage fields.
    Milestone,
    /// Exporter confirms delivery receipt.
    Confirm,
    /// Exporter re-enters a rejected stage; clears its rejection reason.
    Resubmit,
}

/// One allowed edge in the workflow.
#[derive(Debug)]
pub struct Edge {
    pub from: ExportStatus,
    pub to: ExportStatus,
    pub kind: EdgeKind,
    /// Action checked against the gatekeeper permission table.
    pub action: ActionKind,
    pub required: &'static [PayloadField],
    /// Approval record written alongside the transition, if the edge is a
    /// stage decision.
    pub approval: Option<(ApprovalType, Decision)>,
}

use ApprovalType as At;
use Decision::{Approved, Rejected};
use EdgeKind as Ek;
use ExportStatus as S;
use PayloadField as F;

/// The allowed-edge table. Cancellation edges are resolved structurally in
/// [`resolve`], everything else is a row here.
pub const EDGES: &[Edge] = &[
    // ECX lot verification
    Edge {
        from: S::Pending,
        to: S::EcxVerified,
        kind: Ek::Approve,
        action: ActionKind::EcxVerification,
        required: &[F::LotNumber],
        approval: Some((At::EcxVerification, Approved)),
    },
    Edge {
        from: S::Pending,
        to: S::EcxRejected,
        kind: Ek::Reject,
        action: ActionKind::EcxVerification,
        required: &[F::Reason],
        approval: Some((At::EcxVerification, Rejected)),
    },
    // ECTA export license
    Edge {
        from: S::EcxVerified,
        to: S::EctaLicenseApproved,
        kind: Ek::Approve,
        action: ActionKind::LicenseReview,
        required: &[F::LicenseNumber],
        approval: Some((At::EctaLicense, Approved)),
    },
    Edge {
        from: S::EcxVerified,
        to: S::EctaLicenseRejected,
        kind: Ek::Reject,
        action: ActionKind::LicenseReview,
        required: &[F::Reason],
        approval: Some((At::EctaLicense, Rejected)),
    },
    // ECTA quality certification
    Edge {
        from: S::EctaLicenseApproved,
        to: S::EctaQualityApproved,
        kind: Ek::Approve,
        action: ActionKind::QualityReview,
        required: &[F::QualityGrade],
        approval: Some((At::EctaQuality, Approved)),
    },
    Edge {
        from: S::EctaLicenseApproved,
        to: S::EctaQualityRejected,
        kind: Ek::Reject,
        action: ActionKind::QualityReview,
        required: &[F::Reason],
        approval: Some((At::EctaQuality, Rejected)),
    },
    // ECTA sales contract
    Edge {
        from: S::EctaQualityApproved,
        to: S::EctaContractApproved,
        kind: Ek::Approve,
        action: ActionKind::ContractReview,
        required: &[F::ContractNumber],
        approval: Some((At::EctaContract, Approved)),
    },
    Edge {
        from: S::EctaQualityApproved,
        to: S::EctaContractRejected,
        kind: Ek::Reject,
        action: ActionKind::ContractReview,
        required: &[F::Reason],
        approval: Some((At::EctaContract, Rejected)),
    },
    // Commercial bank document verification
    Edge {
        from: S::EctaContractApproved,
        to: S::BankDocumentVerified,
        kind: Ek::Approve,
        action: ActionKind::DocumentReview,
        required: &[F::DocumentReference],
        approval: Some((At::BankDocument, Approved)),
    },
    Edge {
        from: S::EctaContractApproved,
        to: S::BankDocumentRejected,
        kind: Ek::Reject,
        action: ActionKind::DocumentReview,
        required: &[F::Reason],
        approval: Some((At::BankDocument, Rejected)),
    },
    // National bank FX approval
    Edge {
        from: S::BankDocumentVerified,
        to: S::FxApproved,
        kind: Ek::Approve,
        action: ActionKind::FxReview,
        required: &[F::FxApprovalId],
        approval: Some((At::FxApproval, Approved)),
    },
    Edge {
        from: S::BankDocumentVerified,
        to: S::FxRejected,
        kind: Ek::Reject,
        action: ActionKind::FxReview,
        required: &[F::Reason],
        approval: Some((At::FxApproval, Rejected)),
    },
    // Customs clearance
    Edge {
        from: S::FxApproved,
        to: S::CustomsCleared,
        kind: Ek::Approve,
        action: ActionKind::CustomsReview,
        required: &[F::DeclarationNumber],
        approval: Some((At::CustomsClearance, Approved)),
    },
    Edge {
        from: S::FxApproved,
        to: S::CustomsRejected,
        kind: Ek::Reject,
        action: ActionKind::CustomsReview,
        required: &[F::Reason],
        approval: Some((At::CustomsClearance, Rejected)),
    },
    // Shipping
    Edge {
        from: S::CustomsCleared,
        to: S::ShipmentScheduled,
        kind: Ek::Approve,
        action: ActionKind::ScheduleShipment,
        required: &[F::VesselName, F::DepartureDate],
        approval: Some((At::Shipment, Approved)),
    },
    Edge {
        from: S::ShipmentScheduled,
        to: S::Shipped,
        kind: Ek::Milestone,
        action: ActionKind::UpdateShipment,
        required: &[],
        approval: None,
    },
    Edge {
        from: S::Shipped,
        to: S::Arrived,
        kind: Ek::Milestone,
        action: ActionKind::UpdateShipment,
        required: &[F::ArrivalDate],
        approval: None,
    },
    Edge {
        from: S::Arrived,
        to: S::Delivered,
        kind: Ek::Milestone,
        action: ActionKind::UpdateShipment,
        required: &[],
        approval: None,
    },
    // Exporter confirms receipt
    Edge {
        from: S::Delivered,
        to: S::Completed,
        kind: Ek::Confirm,
        action: ActionKind::ConfirmReceipt,
        required: &[],
        approval: None,
    },
    // Resubmission: back to the state the rejected stage is entered from
    Edge {
        from: S::EcxRejected,
        to: S::Pending,
        kind: Ek::Resubmit,
        action: ActionKind::Resubmit,
        required: &[],
        approval: None,
    },
    Edge {
        from: S::EctaLicenseRejected,
        to: S::EcxVerified,
        kind: Ek::Resubmit,
        action: ActionKind::Resubmit,
        required: &[],
        approval: None,
    },
    Edge {
        from: S::EctaQualityRejected,
        to: S::EctaLicenseApproved,
        kind: Ek::Resubmit,
        action: ActionKind::Resubmit,
        required: &[],
        approval: None,
    },
    Edge {
        from: S::EctaContractRejected,
        to: S::EctaQualityApproved,
        kind: Ek::Resubmit,
        action: ActionKind::Resubmit,
        required: &[],
        approval: None,
    },
    Edge {
        from: S::BankDocumentRejected,
        to: S::EctaContractApproved,
        kind: Ek::Resubmit,
        action: ActionKind::Resubmit,
        required: &[],
        approval: None,
    },
    Edge {
        from: S::FxRejected,
        to: S::BankDocumentVerified,
        kind: Ek::Resubmit,
        action: ActionKind::Resubmit,
        required: &[],
        approval: None,
    },
    Edge {
        from: S::CustomsRejected,
        to: S::FxApproved,
        kind: Ek::Resubmit,
        action: ActionKind::Resubmit,
        required: &[],
        approval: None,
    },
];

/// Required payload fields for cancellation.
pub const CANCEL_REQUIRED: &[PayloadField] = &[F::Reason];

/// A resolved legal transition: either a table edge or cancellation.
#[derive(Debug)]
pub enum ResolvedTransition {
    Edge(&'static Edge),
    Cancel,
}

impl ResolvedTransition {
    pub fn action(&self) -> ActionKind {
        match self {
            ResolvedTransition::Edge(edge) => edge.action,
            ResolvedTransition::Cancel => ActionKind::Cancel,
        }
    }

    pub fn required(&self) -> &'static [PayloadField] {
        match self {
            ResolvedTransition::Edge(edge) => edge.required,
            ResolvedTransition::Cancel => CANCEL_REQUIRED,
        }
    }

    pub fn approval(&self) -> Option<(ApprovalType, Decision)> {
        match self {
            ResolvedTransition::Edge(edge) => edge.approval,
            ResolvedTransition::Cancel => None,
        }
    }
}

/// Look up the `(from, to)` pair. `None` means the edge is not allowed.
pub fn resolve(from: ExportStatus, to: ExportStatus) -> Option<ResolvedTransition> {
    if to == ExportStatus::Cancelled {
        if from.is_terminal() {
            return None;
        }
        return Some(ResolvedTransition::Cancel);
    }
    EDGES
        .iter()
        .find(|edge| edge.from == from && edge.to == to)
        .map(ResolvedTransition::Edge)
}

/// Check that every field the transition requires is present.
pub fn check_payload(transition: &ResolvedTransition, payload: &TransitionPayload) -> Result<()> {
    for field in transition.required() {
        if !field.is_present(payload) {
            return Err(ExportflowError::MissingField(field.name()));
        }
    }
    Ok(())
}

/// Apply the transition to the record: new status, merged stage fields,
/// rejection reasons set or cleared, `updated_at` bumped.
///
/// Callers must have validated the transition first; this function only
/// mutates.
pub fn apply(
    record: &mut ExportRecord,
    transition: &ResolvedTransition,
    payload: &TransitionPayload,
    now: DateTime<Utc>,
) {
    match transition {
        ResolvedTransition::Cancel => {
            record.cancellation_reason = payload.reason.clone();
            record.status = ExportStatus::Cancelled;
        }
        ResolvedTransition::Edge(edge) => {
            match edge.kind {
                Ek::Approve | Ek::Milestone => merge_stage_fields(record, edge.to, payload),
                Ek::Reject => {
                    if let Some(slot) = rejection_reason_slot(record, edge.to) {
                        *slot = payload.reason.clone();
                    }
                }
                Ek::Resubmit => {
                    // Clearing the reason is what makes a resubmitted record
                    // look fresh to the reviewing organization.
                    if let Some(slot) = rejection_reason_slot(record, edge.from) {
                        *slot = None;
                    }
                }
                Ek::Confirm => {}
            }
            record.status = edge.to;
        }
    }
    record.updated_at = now;
}

fn merge_stage_fields(record: &mut ExportRecord, to: ExportStatus, payload: &TransitionPayload) {
    match to {
        S::EcxVerified => record.ecx_lot_number = payload.lot_number.clone(),
        S::EctaLicenseApproved => record.export_license_number = payload.license_number.clone(),
        S::EctaQualityApproved => record.quality_grade = payload.quality_grade.clone(),
        S::EctaContractApproved => record.contract_number = payload.contract_number.clone(),
        S::BankDocumentVerified => {
            record.bank_document_reference = payload.document_reference.clone()
        }
        S::FxApproved => record.fx_approval_id = payload.fx_approval_id.clone(),
        S::CustomsCleared => record.customs_declaration_number = payload.declaration_number.clone(),
        S::ShipmentScheduled => {
            record.vessel_name = payload.vessel_name.clone();
            record.departure_date = payload.departure_date;
        }
        S::Arrived => record.arrival_date = payload.arrival_date,
        _ => {}
    }
}

/// The rejection-reason field belonging to a `*_REJECTED` status.
fn rejection_reason_slot(
    record: &mut ExportRecord,
    rejected: ExportStatus,
) -> Option<&mut Option<String>> {
    match rejected {
        S::EcxRejected => Some(&mut record.ecx_rejection_reason),
        S::EctaLicenseRejected => Some(&mut record.ecta_license_rejection_reason),
        S::EctaQualityRejected => Some(&mut record.ecta_quality_rejection_reason),
        S::EctaContractRejected => Some(&mut record.ecta_contract_rejection_reason),
        S::BankDocumentRejected => Some(&mut record.bank_document_rejection_reason),
        S::FxRejected => Some(&mut record.fx_rejection_reason),
        S::CustomsRejected => Some(&mut record.customs_rejection_reason),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::export::{ExportId, NewExport};
    use crate::domain::gatekeeper;

    fn fresh_record() -> ExportRecord {
        NewExport {
            exporter_id: "exp-1".to_string(),
            exporter_name: "Sidamo Coop".to_string(),
            coffee_type: "Arabica".to_string(),
            quantity_kg: 500.0,
            destination_country: "DE".to_string(),
            estimated_value_usd: 25_000.0,
        }
        .into_record(ExportId::new(), Utc::now())
    }

    #[test]
    fn every_pair_outside_the_table_is_disallowed() {
        for from in ExportStatus::ALL {
            for to in ExportStatus::ALL {
                let in_table = EDGES.iter().any(|e| e.from == *from && e.to == *to);
                let cancellable = *to == ExportStatus::Cancelled && !from.is_terminal();
                let resolved = resolve(*from, *to);
                assert_eq!(
                    resolved.is_some(),
                    in_table || cancellable,
                    "resolve({from}, {to}) disagrees with the table"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in [ExportStatus::Completed, ExportStatus::Cancelled] {
            for to in ExportStatus::ALL {
                assert!(resolve(from, *to).is_none(), "{from} -> {to} resolved");
            }
        }
    }

    #[test]
    fn every_rejected_status_has_exactly_one_resubmit_edge() {
        for status in ExportStatus::ALL.iter().filter(|s| s.is_rejected()) {
            let resubmits: Vec<_> = EDGES
                .iter()
                .filter(|e| e.from == *status && e.kind == EdgeKind::Resubmit)
                .collect();
            assert_eq!(resubmits.len(), 1, "status {status}");
        }
    }

    #[test]
    fn every_edge_action_is_owned_by_some_organization() {
        use crate::domain::export::Organization;
        for edge in EDGES {
            let owned = Organization::ALL
                .iter()
                .any(|org| gatekeeper::is_allowed(*org, edge.action));
            assert!(owned, "edge {:?} -> {:?} has an orphan action", edge.from, edge.to);
        }
    }

    #[test]
    fn reject_edges_require_a_reason() {
        for edge in EDGES.iter().filter(|e| e.kind == EdgeKind::Reject) {
            assert!(
                edge.required.contains(&PayloadField::Reason),
                "reject edge to {} does not require a reason",
                edge.to
            );
        }
    }

    #[test]
    fn missing_required_field_is_reported_by_name() {
        let transition = resolve(ExportStatus::Pending, ExportStatus::EcxVerified).unwrap();
        let err = check_payload(&transition, &TransitionPayload::default()).unwrap_err();
        assert!(matches!(
            err,
            ExportflowError::MissingField("lotNumber")
        ));
    }

    #[test]
    fn blank_field_values_do_not_count_as_present() {
        let transition = resolve(ExportStatus::Pending, ExportStatus::EcxVerified).unwrap();
        let payload = TransitionPayload {
            lot_number: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(check_payload(&transition, &payload).is_err());
    }

    #[test]
    fn approve_merges_stage_fields() {
        let mut record = fresh_record();
        let transition = resolve(ExportStatus::Pending, ExportStatus::EcxVerified).unwrap();
        let payload = TransitionPayload {
            lot_number: Some("LOT-42".to_string()),
            ..Default::default()
        };
        apply(&mut record, &transition, &payload, Utc::now());
        assert_eq!(record.status, ExportStatus::EcxVerified);
        assert_eq!(record.ecx_lot_number.as_deref(), Some("LOT-42"));
    }

    #[test]
    fn reject_then_resubmit_clears_the_reason() {
        let mut record = fresh_record();

        let reject = resolve(ExportStatus::Pending, ExportStatus::EcxRejected).unwrap();
        apply(
            &mut record,
            &reject,
            &TransitionPayload::with_reason("lot not found"),
            Utc::now(),
        );
        assert_eq!(record.status, ExportStatus::EcxRejected);
        assert_eq!(record.ecx_rejection_reason.as_deref(), Some("lot not found"));

        let resubmit = resolve(ExportStatus::EcxRejected, ExportStatus::Pending).unwrap();
        apply(&mut record, &resubmit, &TransitionPayload::default(), Utc::now());
        assert_eq!(record.status, ExportStatus::Pending);
        assert_eq!(record.ecx_rejection_reason, None);
    }

    #[test]
    fn cancellation_records_the_reason() {
        let mut record = fresh_record();
        let cancel = resolve(ExportStatus::Pending, ExportStatus::Cancelled).unwrap();
        apply(
            &mut record,
            &cancel,
            &TransitionPayload::with_reason("buyer withdrew"),
            Utc::now(),
        );
        assert_eq!(record.status, ExportStatus::Cancelled);
        assert_eq!(record.cancellation_reason.as_deref(), Some("buyer withdrew"));
    }
}
