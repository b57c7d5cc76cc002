//! Domain model for the export workflow.
//!
//! Everything in here is pure: the status enum, the allowed-edge table, the
//! gatekeeper permission table, and the history/approval value types. No I/O.

pub mod approval;
pub mod export;
pub mod gatekeeper;
pub mod history;

pub use approval::{ApprovalRecord, ApprovalType, Decision};
pub use export::{
    Actor, ExportId, ExportRecord, ExportStatus, NewExport, Organization, TransitionPayload,
};
pub use gatekeeper::ActionKind;
pub use history::StatusHistoryEntry;
