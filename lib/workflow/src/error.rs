//! Error types for the workflow crate.
//!
//! Errors are split by layer:
//! - `HandleError`: malformed port handle strings
//! - `TransformError`: conditions that block serializing a graph
//! - `WireFormatError`: undecodable persisted payloads
//! - `LoadWarning`: incomplete persisted data that was repaired during Load
//!
//! Callers that surface these to users wrap them in a rootcause `Report`.

use crate::edge::PortDirection;
use std::fmt;
use wireflow_core::NodeId;

/// Errors from parsing `{nodeId}-{o|i}{index}` handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The handle does not follow the `{nodeId}-{o|i}{index}` shape.
    Malformed { handle: String },
    /// The handle addresses the wrong side of a node.
    WrongDirection {
        handle: String,
        expected: PortDirection,
    },
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { handle } => write!(f, "malformed port handle '{handle}'"),
            Self::WrongDirection { handle, expected } => {
                write!(f, "port handle '{handle}' is not an {expected} handle")
            }
        }
    }
}

impl std::error::Error for HandleError {}

/// Errors from serializing a graph into the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A workflow without nodes is not a deployable unit.
    EmptyGraph,
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGraph => write!(f, "cannot save a workflow with no nodes"),
        }
    }
}

impl std::error::Error for TransformError {}

/// Errors from decoding or encoding persisted flow documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFormatError {
    /// The payload is not a valid persisted flow.
    Decode { reason: String },
    /// The flow could not be encoded.
    Encode { reason: String },
}

impl fmt::Display for WireFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode { reason } => write!(f, "invalid persisted flow: {reason}"),
            Self::Encode { reason } => write!(f, "failed to encode flow: {reason}"),
        }
    }
}

impl std::error::Error for WireFormatError {}

/// Data problems repaired while loading a persisted flow.
///
/// None of these fail a Load; they are reported so callers can log or
/// display them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The node's type has no definition; default ports and a
    /// heuristic category were used.
    UnknownNodeType { node_id: NodeId, node_type: String },
    /// The node had no usable coordinates and was placed on the fallback grid.
    MissingPosition { node_id: NodeId },
    /// A wire pointed at a node that is not part of the flow.
    DanglingWire { source: NodeId, target: NodeId },
    /// A node id appeared more than once; later copies were discarded.
    DuplicateNode { node_id: NodeId },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNodeType { node_id, node_type } => {
                write!(f, "node {node_id} has unknown type '{node_type}'")
            }
            Self::MissingPosition { node_id } => {
                write!(f, "node {node_id} has no position")
            }
            Self::DanglingWire { source, target } => {
                write!(f, "wire from {source} targets missing node {target}")
            }
            Self::DuplicateNode { node_id } => {
                write!(f, "duplicate node id {node_id}")
            }
        }
    }
}
