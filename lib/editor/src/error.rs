//! Error types for the editor crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ServiceError`: failures reported by external collaborators
//! - `EditorError`: failures surfaced by an editor session

use std::fmt;
use wireflow_core::FlowId;

/// Errors reported by collaborator services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The requested resource does not exist.
    NotFound { resource: String },
    /// The service could not be reached or failed internally.
    Unavailable { reason: String },
    /// The service refused the request.
    Rejected { reason: String },
    /// The update was based on a stale version.
    Conflict {
        expected: Option<u64>,
        found: Option<u64>,
    },
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { resource } => write!(f, "not found: {resource}"),
            Self::Unavailable { reason } => write!(f, "service unavailable: {reason}"),
            Self::Rejected { reason } => write!(f, "request rejected: {reason}"),
            Self::Conflict { expected, found } => {
                let show = |v: &Option<u64>| v.map_or_else(|| "none".to_string(), |v| v.to_string());
                write!(
                    f,
                    "version conflict: stored version is {}, update carried {}",
                    show(expected),
                    show(found)
                )
            }
        }
    }
}

impl std::error::Error for ServiceError {}

/// Errors surfaced by an editor session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// Save was requested for a graph with no nodes. The store is not contacted.
    EmptyGraph,
    /// The flow does not exist; the caller should leave the editor.
    FlowNotFound { flow_id: FlowId },
    /// Loading or saving failed in transport or in the store.
    Persistence { reason: String },
    /// Another client saved the flow since it was loaded.
    SaveConflict { flow_id: FlowId },
    /// An execution is already running for this session.
    AlreadyExecuting,
    /// The execution trigger failed.
    Execution { reason: String },
    /// No completion signal arrived within the configured limit.
    ExecutionTimedOut { after_secs: u64 },
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGraph => write!(f, "cannot save a workflow with no nodes"),
            Self::FlowNotFound { flow_id } => write!(f, "flow not found: {flow_id}"),
            Self::Persistence { reason } => write!(f, "persistence failed: {reason}"),
            Self::SaveConflict { flow_id } => {
                write!(f, "flow {flow_id} was changed by someone else; reload before saving")
            }
            Self::AlreadyExecuting => write!(f, "an execution is already running"),
            Self::Execution { reason } => write!(f, "execution failed: {reason}"),
            Self::ExecutionTimedOut { after_secs } => {
                write!(f, "execution did not complete within {after_secs}s")
            }
        }
    }
}

impl std::error::Error for EditorError {}

impl EditorError {
    /// Maps a store failure during open.
    #[must_use]
    pub fn from_load(flow_id: &FlowId, error: &ServiceError) -> Self {
        match error {
            ServiceError::NotFound { .. } => Self::FlowNotFound {
                flow_id: flow_id.clone(),
            },
            other => Self::Persistence {
                reason: other.to_string(),
            },
        }
    }

    /// Maps a store failure during save.
    #[must_use]
    pub fn from_save(flow_id: &FlowId, error: &ServiceError) -> Self {
        match error {
            ServiceError::Conflict { .. } => Self::SaveConflict {
                flow_id: flow_id.clone(),
            },
            ServiceError::NotFound { .. } => Self::FlowNotFound {
                flow_id: flow_id.clone(),
            },
            other => Self::Persistence {
                reason: other.to_string(),
            },
        }
    }
}
