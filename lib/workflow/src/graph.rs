//! The editable workflow graph.
//!
//! Nodes and edges are kept in insertion order because Save emits wires in
//! edge insertion order. Topology queries build a petgraph view on demand.
//!
//! Mutations here are pure graph operations; recording that the graph is
//! dirty is the caller's job (see [`crate::tracker`]).

use crate::catalog::NodeDefinition;
use crate::edge::{GraphEdge, PortDirection, PortHandle};
use crate::node::{GraphNode, Position};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use tracing::debug;
use wireflow_core::{EdgeId, NodeId};

/// A workflow graph: nodes, edges and the current selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    #[serde(skip)]
    selected: Option<NodeId>,
}

impl FlowGraph {
    /// Creates a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from already-validated parts.
    #[must_use]
    pub fn from_parts(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self {
            nodes,
            edges,
            selected: None,
        }
    }

    /// Instantiates a definition at a position and appends it.
    pub fn add_node(&mut self, definition: &NodeDefinition, position: Position) -> GraphNode {
        let node = GraphNode::from_definition(definition, position);
        debug!(node_id = %node.id, node_type = %node.node_type, "Added node");
        self.nodes.push(node.clone());
        node
    }

    /// Appends an existing node. Returns false if its id is already taken.
    pub fn insert_node(&mut self, node: GraphNode) -> bool {
        if self.contains_node(&node.id) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Shallow-merges `partial` into a node's config. Unknown ids are ignored.
    pub fn update_node_config(&mut self, node_id: &NodeId, partial: &Map<String, JsonValue>) {
        match self.get_node_mut(node_id) {
            Some(node) => node.config.merge(partial),
            None => debug!(node_id = %node_id, "Config update for unknown node ignored"),
        }
    }

    /// Moves a node. Unknown ids are ignored.
    pub fn move_node(&mut self, node_id: &NodeId, position: Position) {
        if let Some(node) = self.get_node_mut(node_id) {
            node.position = position;
        }
    }

    /// Renames a node. Unknown ids are ignored.
    pub fn rename_node(&mut self, node_id: &NodeId, label: impl Into<String>) {
        if let Some(node) = self.get_node_mut(node_id) {
            node.label = label.into();
        }
    }

    /// Removes a node and every edge that starts or ends at it.
    ///
    /// Clears the selection if it pointed at the node.
    pub fn delete_node(&mut self, node_id: &NodeId) -> Option<GraphNode> {
        let position = self.nodes.iter().position(|n| &n.id == node_id)?;
        let node = self.nodes.remove(position);

        let before = self.edges.len();
        self.edges.retain(|edge| !edge.references(node_id));
        debug!(
            node_id = %node_id,
            removed_edges = before - self.edges.len(),
            "Deleted node"
        );

        if self.selected.as_ref() == Some(node_id) {
            self.selected = None;
        }
        Some(node)
    }

    /// Connects an output port to an input port.
    ///
    /// Returns `None` without changing the graph when either node is
    /// missing, a handle is malformed or belongs to a different node, or an
    /// edge between the same two ports already exists. Distinct ports may
    /// fan in and fan out freely.
    pub fn connect(
        &mut self,
        source: &NodeId,
        source_handle: &str,
        target: &NodeId,
        target_handle: &str,
    ) -> Option<GraphEdge> {
        if !self.contains_node(source) || !self.contains_node(target) {
            debug!(source = %source, target = %target, "Connection to unknown node rejected");
            return None;
        }

        let from = PortHandle::parse_expecting(source_handle, PortDirection::Output).ok()?;
        let to = PortHandle::parse_expecting(target_handle, PortDirection::Input).ok()?;
        if &from.node_id != source || &to.node_id != target {
            debug!(source_handle, target_handle, "Handle does not belong to its node");
            return None;
        }

        let edge = GraphEdge::new(EdgeId::new(), &from, &to);
        if self.edges.iter().any(|existing| existing.same_ports(&edge)) {
            debug!(source_handle, target_handle, "Duplicate connection suppressed");
            return None;
        }

        self.edges.push(edge.clone());
        Some(edge)
    }

    /// Removes a single edge.
    pub fn delete_edge(&mut self, edge_id: &EdgeId) -> Option<GraphEdge> {
        let position = self.edges.iter().position(|e| &e.id == edge_id)?;
        Some(self.edges.remove(position))
    }

    /// Selects a node, or clears the selection. Unknown ids clear it.
    pub fn select_node(&mut self, node_id: Option<&NodeId>) {
        self.selected = node_id.filter(|id| self.contains_node(id)).cloned();
    }

    /// Returns the selected node, if any.
    #[must_use]
    pub fn selected_node(&self) -> Option<&GraphNode> {
        self.selected.as_ref().and_then(|id| self.get_node(id))
    }

    /// Returns a node by id.
    #[must_use]
    pub fn get_node(&self, node_id: &NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| &n.id == node_id)
    }

    fn get_node_mut(&mut self, node_id: &NodeId) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| &n.id == node_id)
    }

    /// Returns an edge by id.
    #[must_use]
    pub fn get_edge(&self, edge_id: &EdgeId) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| &e.id == edge_id)
    }

    #[must_use]
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == node_id)
    }

    /// Returns all nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Returns all edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Builds a petgraph view of the graph. Edge weights index into `edges()`.
    fn topology(&self) -> (DiGraph<&NodeId, usize>, HashMap<&NodeId, NodeIndex>) {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut index_map = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            index_map.insert(&node.id, graph.add_node(&node.id));
        }
        for (position, edge) in self.edges.iter().enumerate() {
            if let (Some(&source), Some(&target)) =
                (index_map.get(&edge.source), index_map.get(&edge.target))
            {
                graph.add_edge(source, target, position);
            }
        }
        (graph, index_map)
    }

    fn neighbors(&self, node_id: &NodeId, direction: Direction) -> Vec<(&GraphNode, &GraphEdge)> {
        self.edges
            .iter()
            .filter(|edge| match direction {
                Direction::Outgoing => &edge.source == node_id,
                Direction::Incoming => &edge.target == node_id,
            })
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Outgoing => &edge.target,
                    Direction::Incoming => &edge.source,
                };
                Some((self.get_node(other)?, edge))
            })
            .collect()
    }

    /// Returns the downstream nodes of a node with the connecting edges.
    #[must_use]
    pub fn successors(&self, node_id: &NodeId) -> Vec<(&GraphNode, &GraphEdge)> {
        self.neighbors(node_id, Direction::Outgoing)
    }

    /// Returns the upstream nodes of a node with the connecting edges.
    #[must_use]
    pub fn predecessors(&self, node_id: &NodeId) -> Vec<(&GraphNode, &GraphEdge)> {
        self.neighbors(node_id, Direction::Incoming)
    }

    /// Returns nodes that have no incoming edges (entry points).
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<&GraphNode> {
        self.nodes_without(Direction::Incoming)
    }

    /// Returns nodes that have no outgoing edges (terminal nodes).
    #[must_use]
    pub fn terminal_nodes(&self) -> Vec<&GraphNode> {
        self.nodes_without(Direction::Outgoing)
    }

    fn nodes_without(&self, direction: Direction) -> Vec<&GraphNode> {
        let (graph, index_map) = self.topology();
        self.nodes
            .iter()
            .filter(|node| {
                index_map.get(&node.id).is_some_and(|&index| {
                    graph.edges_directed(index, direction).next().is_none()
                })
            })
            .collect()
    }

    /// Returns true if the graph contains a directed cycle.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        let (graph, _) = self.topology();
        petgraph::algo::is_cyclic_directed(&graph)
    }
}
