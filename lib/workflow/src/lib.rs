//! Workflow graph model and wire-format synchronization for wireflow.
//!
//! This crate provides the editor-side core of a node-wire workflow editor:
//!
//! - **Catalog**: node definitions supplied by the Definition Provider
//! - **Graph Model**: nodes with typed config, port-addressed edges, topology queries
//! - **Wire Format**: the persisted flow document, one target array per output port
//! - **Port Resolver**: deterministic reconstruction of input ports on Load
//! - **Transform**: Load and Save between the wire format and the graph
//! - **Tracker**: dirty/clean edit state with in-flight save handling

pub mod catalog;
pub mod definition;
pub mod edge;
pub mod error;
pub mod graph;
pub mod node;
pub mod port;
pub mod tracker;
pub mod transform;
pub mod wire;

pub use catalog::{DefinitionCatalog, FieldDescriptor, FieldType, NodeCategory, NodeDefinition};
pub use definition::{FlowMetadata, Workflow, WorkflowSummary};
pub use edge::{GraphEdge, PortDirection, PortHandle};
pub use error::{HandleError, LoadWarning, TransformError, WireFormatError};
pub use graph::FlowGraph;
pub use node::{CategoryConfig, ExecutionSettings, GraphNode, NodeConfig, Position};
pub use tracker::{EditState, EditTracker, Revision};
pub use wire::{FlowStatus, PersistedFlow, PersistedNode};
