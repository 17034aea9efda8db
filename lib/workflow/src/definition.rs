//! Workflow types.
//!
//! A workflow is one open flow: its identity, the metadata carried through
//! from the persisted document, and the editable graph.

use crate::graph::FlowGraph;
use crate::wire::FlowStatus;
use serde::{Deserialize, Serialize};
use wireflow_core::FlowId;

/// Metadata of a flow, carried unchanged between Load and Save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMetadata {
    /// Human-readable name.
    pub name: String,
    pub description: Option<String>,
    pub status: FlowStatus,
    /// Concurrency token from the store, if it tracks versions.
    pub version: Option<u64>,
}

impl FlowMetadata {
    /// Creates metadata for a new draft flow.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            status: FlowStatus::Draft,
            version: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: FlowStatus) -> Self {
        self.status = status;
        self
    }
}

/// A flow open in the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: FlowId,
    pub metadata: FlowMetadata,
    pub graph: FlowGraph,
}

impl Workflow {
    /// Creates a workflow with an empty graph.
    #[must_use]
    pub fn new(id: FlowId, metadata: FlowMetadata) -> Self {
        Self {
            id,
            metadata,
            graph: FlowGraph::new(),
        }
    }

    /// Sets the graph.
    #[must_use]
    pub fn with_graph(mut self, graph: FlowGraph) -> Self {
        self.graph = graph;
        self
    }

    /// Returns a short summary for listings.
    #[must_use]
    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            id: self.id.clone(),
            name: self.metadata.name.clone(),
            status: self.metadata.status,
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            entry_points: self.graph.entry_nodes().len(),
            has_cycle: self.graph.has_cycle(),
        }
    }
}

/// Shape of a workflow at a glance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: FlowId,
    pub name: String,
    pub status: FlowStatus,
    pub node_count: usize,
    pub edge_count: usize,
    pub entry_points: usize,
    pub has_cycle: bool,
}
