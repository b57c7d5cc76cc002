//! Error types for the export workflow engine.

use thiserror::Error;

use crate::domain::{ExportId, ExportStatus, Organization};

/// Result type alias using the exportflow error type.
pub type Result<T> = std::result::Result<T, ExportflowError>;

/// Main error type for the export workflow engine.
///
/// Every expected failure mode of a transition is a distinct variant so the
/// HTTP boundary can map them to status codes without string matching. Only
/// genuinely unexpected faults (storage down, serialization bugs) travel
/// through the opaque variants.
#[derive(Error, Debug)]
pub enum ExportflowError {
    /// Referenced export does not exist
    #[error("Export not found: {0}")]
    NotFound(ExportId),

    /// Requested edge is not in the allowed-edge table from the current state
    #[error("Invalid transition for export {id}: {from} -> {to} is not an allowed edge")]
    InvalidTransition {
        id: ExportId,
        from: ExportStatus,
        to: ExportStatus,
    },

    /// Acting organization is not authorized for the requested edge
    #[error("Organization {organization} is not authorized to perform '{action}'")]
    Unauthorized {
        organization: Organization,
        action: &'static str,
    },

    /// Payload lacks a field the requested edge requires
    #[error("Missing required payload field: {0}")]
    MissingField(&'static str),

    /// Optimistic-concurrency check failed: the record changed underneath the caller.
    /// Callers should re-fetch and retry once; the engine never retries itself.
    #[error("Export {0} was modified concurrently, re-fetch and retry")]
    ConcurrentModification(ExportId),

    /// Validation error on submitted data (e.g. empty exporter id, non-positive quantity)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error from anyhow (storage faults and other unexpected conditions)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExportflowError {
    /// Stable machine-readable kind, used in error responses and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ExportflowError::NotFound(_) => "not_found",
            ExportflowError::InvalidTransition { .. } => "invalid_transition",
            ExportflowError::Unauthorized { .. } => "unauthorized",
            ExportflowError::MissingField(_) => "missing_field",
            ExportflowError::ConcurrentModification(_) => "concurrent_modification",
            ExportflowError::Validation(_) => "validation",
            ExportflowError::Serialization(_) => "serialization",
            ExportflowError::Other(_) => "internal",
        }
    }
}
