//! Interfaces of the external collaborators an editor session talks to.
//!
//! The editor never reaches a backend directly. Each collaborator is a
//! trait so that sessions can run against HTTP clients, files on disk or
//! the in-memory implementations in [`crate::memory`].

use crate::error::ServiceError;
use crate::logs::ExecutionLogEntry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use wireflow_core::{FlowId, NodeId};
use wireflow_workflow::{DefinitionCatalog, PersistedFlow};

/// Supplies the node definitions available to the editor.
#[async_trait]
pub trait DefinitionProvider: Send + Sync {
    async fn definitions(&self) -> Result<DefinitionCatalog, ServiceError>;
}

/// Reads and writes persisted flows.
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Fetches a flow. A missing flow is [`ServiceError::NotFound`].
    async fn get(&self, flow_id: &FlowId) -> Result<PersistedFlow, ServiceError>;

    /// Replaces a flow.
    ///
    /// Stores that track versions reject a flow whose `version` does not
    /// match the stored one with [`ServiceError::Conflict`], and store the
    /// accepted flow with its version incremented.
    async fn update(&self, flow_id: &FlowId, flow: PersistedFlow) -> Result<(), ServiceError>;
}

/// A manual execution request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Start from this node instead of the flow's entry points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    /// Message injected into the flow.
    #[serde(default)]
    pub payload: JsonValue,
}

impl ExecutionRequest {
    #[must_use]
    pub fn with_payload(payload: JsonValue) -> Self {
        Self {
            node_id: None,
            payload,
        }
    }

    #[must_use]
    pub fn from_node(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }
}

/// The trigger response, which is also the completion signal of an execution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    #[serde(default)]
    pub logs: Vec<ExecutionLogEntry>,
}

/// Triggers a manual execution and waits for it to finish.
#[async_trait]
pub trait ExecutionService: Send + Sync {
    async fn execute(
        &self,
        flow_id: &FlowId,
        request: ExecutionRequest,
    ) -> Result<ExecutionOutcome, ServiceError>;
}

/// The Debug Log Service: recent execution log entries of a flow.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Returns at most `limit` of the most recent entries.
    async fn get_logs(
        &self,
        flow_id: &FlowId,
        limit: usize,
    ) -> Result<Vec<ExecutionLogEntry>, ServiceError>;
}
