//! Status workflow engine for consortium-tracked coffee exports.
//!
//! One export record moves through a long, branching sequence of statuses as
//! each organization (ECX, ECTA, the banks, customs, the shipping line)
//! approves or rejects it in turn. This crate provides the transition engine
//! that validates and commits those status changes atomically, the
//! append-only history/approval audit trail, and the REST boundary the
//! organization services call into.
//!
//! Workflow engine with PostgreSQL storage and an axum HTTP boundary.

pub mod domain;
pub mod engine;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod metrics;
pub mod storage;

// Re-export commonly used types
pub use domain::{
    Actor, ApprovalRecord, ApprovalType, Decision, ExportId, ExportRecord, ExportStatus,
    NewExport, Organization, StatusHistoryEntry, TransitionPayload,
};
pub use engine::{ExportSummary, TransitionEngine, TransitionRequest};
pub use error::{ExportflowError, Result};
pub use storage::memory::InMemoryExportStore;
#[cfg(feature = "postgres")]
pub use storage::postgres::PostgresExportStore;
pub use storage::{ExportFilter, ExportStore, TransitionCommit};

/// Get the exportflow database migrator
///
/// Returns a migrator that can be run against a connection pool.
#[cfg(feature = "postgres")]
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}
