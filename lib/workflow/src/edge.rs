//! Edge types for workflow graphs.
//!
//! Edges connect a numbered output port on one node to a numbered input
//! port on another. Ports are addressed by handle strings of the form
//! `{nodeId}-o{index}` (outputs) and `{nodeId}-i{index}` (inputs).

use crate::error::HandleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use wireflow_core::{EdgeId, NodeId};

/// Which side of a node a port is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    const fn marker(self) -> char {
        match self {
            Self::Input => 'i',
            Self::Output => 'o',
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// A parsed port handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortHandle {
    pub node_id: NodeId,
    pub direction: PortDirection,
    pub index: usize,
}

impl PortHandle {
    /// Handle of an output port.
    #[must_use]
    pub fn output(node_id: NodeId, index: usize) -> Self {
        Self {
            node_id,
            direction: PortDirection::Output,
            index,
        }
    }

    /// Handle of an input port.
    #[must_use]
    pub fn input(node_id: NodeId, index: usize) -> Self {
        Self {
            node_id,
            direction: PortDirection::Input,
            index,
        }
    }

    /// Parses a handle and checks that it is on the expected side.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is malformed or addresses the other side.
    pub fn parse_expecting(raw: &str, expected: PortDirection) -> Result<Self, HandleError> {
        let handle: Self = raw.parse()?;
        if handle.direction != expected {
            return Err(HandleError::WrongDirection {
                handle: raw.to_string(),
                expected,
            });
        }
        Ok(handle)
    }
}

impl fmt::Display for PortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}{}", self.node_id, self.direction.marker(), self.index)
    }
}

impl FromStr for PortHandle {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || HandleError::Malformed {
            handle: s.to_string(),
        };

        // Node ids may themselves contain dashes, so split on the last one.
        let (node, port) = s.rsplit_once('-').ok_or_else(malformed)?;
        if node.is_empty() {
            return Err(malformed());
        }
        let mut chars = port.chars();
        let direction = match chars.next() {
            Some('o') => PortDirection::Output,
            Some('i') => PortDirection::Input,
            _ => return Err(malformed()),
        };
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let index = digits.parse().map_err(|_| malformed())?;

        Ok(Self {
            node_id: NodeId::from(node),
            direction,
            index,
        })
    }
}

/// A connection between two node ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: EdgeId,
    /// The source node ID.
    pub source: NodeId,
    /// The target node ID.
    pub target: NodeId,
    /// `{source}-o{index}`.
    pub source_handle: String,
    /// `{target}-i{index}`.
    pub target_handle: String,
}

impl GraphEdge {
    /// Creates an edge between an output port and an input port.
    #[must_use]
    pub fn new(id: EdgeId, source: &PortHandle, target: &PortHandle) -> Self {
        Self {
            id,
            source: source.node_id.clone(),
            target: target.node_id.clone(),
            source_handle: source.to_string(),
            target_handle: target.to_string(),
        }
    }

    /// Creates an edge whose id is derived from its handles.
    ///
    /// Used for edges reconstructed from the wire format so that loading
    /// the same data twice yields the same edge ids.
    #[must_use]
    pub fn derived(source: &PortHandle, target: &PortHandle) -> Self {
        let id = EdgeId::from_raw(format!("{source}->{target}"));
        Self::new(id, source, target)
    }

    /// Returns the output port index encoded in `source_handle`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is malformed or not an output handle.
    pub fn output_index(&self) -> Result<usize, HandleError> {
        PortHandle::parse_expecting(&self.source_handle, PortDirection::Output).map(|h| h.index)
    }

    /// Returns the input port index encoded in `target_handle`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is malformed or not an input handle.
    pub fn input_index(&self) -> Result<usize, HandleError> {
        PortHandle::parse_expecting(&self.target_handle, PortDirection::Input).map(|h| h.index)
    }

    /// Returns true if this edge touches the node on either end.
    #[must_use]
    pub fn references(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }

    /// Returns true if both edges join the same pair of ports.
    #[must_use]
    pub fn same_ports(&self, other: &Self) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.source_handle == other.source_handle
            && self.target_handle == other.target_handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_display() {
        let handle = PortHandle::output(NodeId::from("abc"), 2);
        assert_eq!(handle.to_string(), "abc-o2");
        let handle = PortHandle::input(NodeId::from("abc"), 0);
        assert_eq!(handle.to_string(), "abc-i0");
    }

    #[test]
    fn parse_handle_with_dashed_node_id() {
        let handle: PortHandle = "3f2a-91bc-77de-o12".parse().expect("parse");
        assert_eq!(handle.node_id.as_str(), "3f2a-91bc-77de");
        assert_eq!(handle.direction, PortDirection::Output);
        assert_eq!(handle.index, 12);
    }

    #[test]
    fn parse_rejects_malformed_handles() {
        for raw in ["", "abc", "-o1", "abc-x1", "abc-o", "abc-o-1", "abc-o1a", "abc-i+1"] {
            assert!(raw.parse::<PortHandle>().is_err(), "{raw} should not parse");
        }
    }

    #[test]
    fn parse_expecting_checks_direction() {
        let err = PortHandle::parse_expecting("n1-i0", PortDirection::Output).unwrap_err();
        assert!(matches!(err, HandleError::WrongDirection { .. }));
    }

    #[test]
    fn edge_port_indices() {
        let edge = GraphEdge::derived(
            &PortHandle::output(NodeId::from("a"), 1),
            &PortHandle::input(NodeId::from("b"), 3),
        );
        assert_eq!(edge.id.as_str(), "a-o1->b-i3");
        assert_eq!(edge.output_index(), Ok(1));
        assert_eq!(edge.input_index(), Ok(3));
    }

    #[test]
    fn edge_references_both_ends() {
        let edge = GraphEdge::derived(
            &PortHandle::output(NodeId::from("a"), 0),
            &PortHandle::input(NodeId::from("b"), 0),
        );
        assert!(edge.references(&NodeId::from("a")));
        assert!(edge.references(&NodeId::from("b")));
        assert!(!edge.references(&NodeId::from("c")));
    }

    #[test]
    fn edge_serializes_camel_case() {
        let edge = GraphEdge::derived(
            &PortHandle::output(NodeId::from("a"), 0),
            &PortHandle::input(NodeId::from("b"), 0),
        );
        let json = serde_json::to_value(&edge).expect("serialize");
        assert_eq!(json["sourceHandle"], "a-o0");
        assert_eq!(json["targetHandle"], "b-i0");
    }
}
