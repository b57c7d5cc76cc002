//! Export aggregate - record, status enum, and the allowed-edge table.

pub mod state;
pub mod transitions;

// Re-export commonly used types
pub use state::*;
pub use transitions::{Edge, EdgeKind, PayloadField, ResolvedTransition, TransitionPayload, EDGES};
