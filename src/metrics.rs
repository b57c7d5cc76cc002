//! Metric names and recording helpers for the workflow engine.
//!
//! Uses the `metrics` facade; the embedding binary decides which recorder
//! (if any) to install.

use crate::domain::{ExportStatus, Organization};

pub const TRANSITIONS_TOTAL: &str = "exportflow_transitions_total";
pub const TRANSITIONS_DENIED_TOTAL: &str = "exportflow_transitions_denied_total";
pub const EXPORTS_SUBMITTED_TOTAL: &str = "exportflow_exports_submitted_total";

/// Record a committed transition.
pub fn record_transition(to: ExportStatus, organization: Organization) {
    metrics::counter!(
        TRANSITIONS_TOTAL,
        "to" => to.as_str(),
        "organization" => organization.as_str(),
    )
    .increment(1);
}

/// Record a denied transition, labeled by denial kind
/// (invalid_transition, unauthorized, missing_field, concurrent_modification, ...).
pub fn record_denied(reason: &'static str, organization: Organization) {
    metrics::counter!(
        TRANSITIONS_DENIED_TOTAL,
        "reason" => reason,
        "organization" => organization.as_str(),
    )
    .increment(1);
}

/// Record a new export submission.
pub fn record_submission() {
    metrics::counter!(EXPORTS_SUBMITTED_TOTAL).increment(1);
}
