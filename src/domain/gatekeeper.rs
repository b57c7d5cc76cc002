//! Organization gatekeeper: the static permission table.
//!
//! Maps `(organization, action)` to a yes/no answer. This is pure data
//! consulted by the transition engine before any change is committed; there
//! is no dynamic policy language and no I/O here.

use super::export::{Actor, ExportRecord, Organization};

/// Workflow actions an organization can be permitted to perform.
///
/// Each edge in the transition table names exactly one action; the gatekeeper
/// decides which organizations may perform it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SubmitExport,
    EcxVerification,
    LicenseReview,
    QualityReview,
    ContractReview,
    DocumentReview,
    FxReview,
    CustomsReview,
    ScheduleShipment,
    UpdateShipment,
    ConfirmReceipt,
    Resubmit,
    Cancel,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::SubmitExport => "submit_export",
            ActionKind::EcxVerification => "ecx_verification",
            ActionKind::LicenseReview => "license_review",
            ActionKind::QualityReview => "quality_review",
            ActionKind::ContractReview => "contract_review",
            ActionKind::DocumentReview => "document_review",
            ActionKind::FxReview => "fx_review",
            ActionKind::CustomsReview => "customs_review",
            ActionKind::ScheduleShipment => "schedule_shipment",
            ActionKind::UpdateShipment => "update_shipment",
            ActionKind::ConfirmReceipt => "confirm_receipt",
            ActionKind::Resubmit => "resubmit",
            ActionKind::Cancel => "cancel",
        }
    }
}

/// The permission table. One row per organization.
pub const PERMISSIONS: &[(Organization, &[ActionKind])] = &[
    (Organization::Ecx, &[ActionKind::EcxVerification]),
    (
        Organization::Ecta,
        &[
            ActionKind::LicenseReview,
            ActionKind::QualityReview,
            ActionKind::ContractReview,
        ],
    ),
    (Organization::CommercialBank, &[ActionKind::DocumentReview]),
    (Organization::NationalBank, &[ActionKind::FxReview]),
    (Organization::Customs, &[ActionKind::CustomsReview]),
    (
        Organization::ShippingLine,
        &[ActionKind::ScheduleShipment, ActionKind::UpdateShipment],
    ),
    (
        Organization::Exporter,
        &[
            ActionKind::SubmitExport,
            ActionKind::ConfirmReceipt,
            ActionKind::Resubmit,
            ActionKind::Cancel,
        ],
    ),
];

/// Exporter actions that only apply to the actor's own export: being in
/// `Organization::Exporter` is not enough, the actor must be the record's
/// exporter.
pub const OWNER_SCOPED: &[ActionKind] = &[
    ActionKind::Resubmit,
    ActionKind::ConfirmReceipt,
    ActionKind::Cancel,
];

/// True if the organization is permitted to perform the action.
pub fn is_allowed(organization: Organization, action: ActionKind) -> bool {
    PERMISSIONS
        .iter()
        .find(|(org, _)| *org == organization)
        .map(|(_, actions)| actions.contains(&action))
        .unwrap_or(false)
}

/// True if the action is restricted to the export's own exporter.
pub fn is_owner_scoped(action: ActionKind) -> bool {
    OWNER_SCOPED.contains(&action)
}

/// True if the actor is the exporter the record belongs to.
pub fn owns_export(actor: &Actor, record: &ExportRecord) -> bool {
    actor.organization == Organization::Exporter && actor.id == record.exporter_id
}

/// Cancellation is narrower than the table: only the export's own exporter,
/// or an administrator, may cancel.
pub fn may_cancel(actor: &Actor, record: &ExportRecord) -> bool {
    if actor.admin {
        return true;
    }
    owns_export(actor, record) && is_allowed(actor.organization, ActionKind::Cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::export::{ExportId, NewExport};

    fn record_for(exporter_id: &str) -> ExportRecord {
        NewExport {
            exporter_id: exporter_id.to_string(),
            exporter_name: "Sidamo Coop".to_string(),
            coffee_type: "Arabica".to_string(),
            quantity_kg: 500.0,
            destination_country: "DE".to_string(),
            estimated_value_usd: 25_000.0,
        }
        .into_record(ExportId::new(), chrono::Utc::now())
    }

    #[test]
    fn each_review_action_has_exactly_one_owning_organization() {
        let review_actions = [
            ActionKind::EcxVerification,
            ActionKind::LicenseReview,
            ActionKind::QualityReview,
            ActionKind::ContractReview,
            ActionKind::DocumentReview,
            ActionKind::FxReview,
            ActionKind::CustomsReview,
            ActionKind::ScheduleShipment,
        ];
        for action in review_actions {
            let owners: Vec<_> = Organization::ALL
                .iter()
                .filter(|org| is_allowed(**org, action))
                .collect();
            assert_eq!(owners.len(), 1, "action {action:?} owners: {owners:?}");
        }
    }

    #[test]
    fn banks_cannot_perform_each_others_reviews() {
        assert!(is_allowed(Organization::CommercialBank, ActionKind::DocumentReview));
        assert!(!is_allowed(Organization::CommercialBank, ActionKind::FxReview));
        assert!(is_allowed(Organization::NationalBank, ActionKind::FxReview));
        assert!(!is_allowed(Organization::NationalBank, ActionKind::DocumentReview));
    }

    #[test]
    fn exporter_self_service_actions_are_owner_scoped() {
        for action in [
            ActionKind::Resubmit,
            ActionKind::ConfirmReceipt,
            ActionKind::Cancel,
        ] {
            assert!(is_owner_scoped(action), "{action:?}");
        }
        // Review actions stay organization-wide
        assert!(!is_owner_scoped(ActionKind::EcxVerification));
        assert!(!is_owner_scoped(ActionKind::SubmitExport));

        let record = record_for("exp-1");
        assert!(owns_export(
            &Actor::new("exp-1", Organization::Exporter),
            &record
        ));
        assert!(!owns_export(
            &Actor::new("exp-2", Organization::Exporter),
            &record
        ));
        // Matching id in the wrong organization is not ownership
        assert!(!owns_export(&Actor::new("exp-1", Organization::Ecx), &record));
    }

    #[test]
    fn only_the_owning_exporter_or_admin_may_cancel() {
        let record = record_for("exp-1");

        let owner = Actor::new("exp-1", Organization::Exporter);
        assert!(may_cancel(&owner, &record));

        let other = Actor::new("exp-2", Organization::Exporter);
        assert!(!may_cancel(&other, &record));

        let ecx = Actor::new("ecx-user", Organization::Ecx);
        assert!(!may_cancel(&ecx, &record));

        let admin = Actor::admin("ops-1", Organization::NationalBank);
        assert!(may_cancel(&admin, &record));
    }
}
