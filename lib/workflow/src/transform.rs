//! Conversion between the persisted wire format and the editable graph.
//!
//! Load never fails on incomplete data. Unknown node types fall back to
//! [`DEFAULT_PORTS`](crate::catalog::DEFAULT_PORTS) and a category guessed
//! from the type name, nodes without coordinates go onto a fallback grid,
//! and wires to nodes that are not in the flow are dropped. Each repair is
//! reported as a [`LoadWarning`].
//!
//! Save rejects an empty graph and otherwise always succeeds.

use crate::catalog::DefinitionCatalog;
use crate::definition::{FlowMetadata, Workflow};
use crate::error::{LoadWarning, TransformError};
use crate::graph::FlowGraph;
use crate::node::{GraphNode, NodeConfig, Position};
use crate::port::{WireIndex, flatten_wires, resolve_edges};
use crate::wire::{LAYER, PersistedFlow, PersistedNode, RESERVED_FIELDS};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;
use tracing::{debug, warn};
use wireflow_core::{FlowId, NodeId};

const GRID_COLUMNS: usize = 4;
const GRID_ORIGIN: Position = Position::new(100.0, 100.0);
const GRID_SPACING_X: f64 = 250.0;
const GRID_SPACING_Y: f64 = 150.0;

/// Returns the fallback canvas position for the node at `slot`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn grid_slot(slot: usize) -> Position {
    let column = (slot % GRID_COLUMNS) as f64;
    let row = (slot / GRID_COLUMNS) as f64;
    Position::new(
        GRID_ORIGIN.x + column * GRID_SPACING_X,
        GRID_ORIGIN.y + row * GRID_SPACING_Y,
    )
}

/// Builds a workflow from a persisted flow, discarding repair warnings.
#[must_use]
pub fn load(id: FlowId, flow: &PersistedFlow, catalog: &DefinitionCatalog) -> Workflow {
    load_with_warnings(id, flow, catalog).0
}

/// Builds a workflow from a persisted flow and reports every repair made.
#[must_use]
pub fn load_with_warnings(
    id: FlowId,
    flow: &PersistedFlow,
    catalog: &DefinitionCatalog,
) -> (Workflow, Vec<LoadWarning>) {
    let mut warnings = Vec::new();

    let mut seen = HashSet::with_capacity(flow.nodes.len());
    let mut kept: Vec<&PersistedNode> = Vec::with_capacity(flow.nodes.len());
    for node in &flow.nodes {
        if seen.insert(&node.id) {
            kept.push(node);
        } else {
            warn!(flow_id = %id, node_id = %node.id, "Discarding duplicate node");
            warnings.push(LoadWarning::DuplicateNode {
                node_id: node.id.clone(),
            });
        }
    }

    let nodes: Vec<GraphNode> = kept
        .iter()
        .enumerate()
        .map(|(slot, node)| load_node(slot, node, catalog, &mut warnings))
        .collect();

    let triples = flatten_wires(kept.iter().map(|n| (&n.id, n.wires.as_slice())))
        .into_iter()
        .filter(|triple| {
            if seen.contains(&triple.target) {
                return true;
            }
            warn!(
                flow_id = %id,
                source = %triple.source,
                target = %triple.target,
                "Dropping wire to missing node"
            );
            warnings.push(LoadWarning::DanglingWire {
                source: triple.source.clone(),
                target: triple.target.clone(),
            });
            false
        })
        .collect::<Vec<_>>();
    let edges = resolve_edges(&triples);

    debug!(
        flow_id = %id,
        nodes = nodes.len(),
        edges = edges.len(),
        warnings = warnings.len(),
        "Loaded flow"
    );

    let metadata = FlowMetadata {
        name: flow.name.clone(),
        description: flow.description.clone(),
        status: flow.status,
        version: flow.version,
    };
    let workflow = Workflow::new(id, metadata).with_graph(FlowGraph::from_parts(nodes, edges));
    (workflow, warnings)
}

fn load_node(
    slot: usize,
    node: &PersistedNode,
    catalog: &DefinitionCatalog,
    warnings: &mut Vec<LoadWarning>,
) -> GraphNode {
    let definition = catalog.get(&node.node_type);
    if definition.is_none() {
        debug!(node_id = %node.id, node_type = %node.node_type, "Unknown node type");
        warnings.push(LoadWarning::UnknownNodeType {
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
        });
    }
    let category = catalog.category_for(&node.node_type);

    let position = if let Some((x, y)) = node.coordinates() {
        Position::new(x, y)
    } else {
        warnings.push(LoadWarning::MissingPosition {
            node_id: node.id.clone(),
        });
        grid_slot(slot)
    };

    let label = node
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .or_else(|| definition.map(|d| d.label.as_str()).filter(|l| !l.is_empty()))
        .unwrap_or(node.node_type.as_str())
        .to_string();

    GraphNode {
        id: node.id.clone(),
        node_type: node.node_type.clone(),
        category,
        label,
        position,
        config: NodeConfig::from_stored(category, &node.extra),
        icon: definition.map(|d| d.icon.clone()).filter(|s| !s.is_empty()),
        color: definition.map(|d| d.color.clone()).filter(|s| !s.is_empty()),
    }
}

/// Serializes a workflow into the persisted wire format.
///
/// # Errors
///
/// Returns [`TransformError::EmptyGraph`] if the graph has no nodes.
pub fn save(workflow: &Workflow, catalog: &DefinitionCatalog) -> Result<PersistedFlow, TransformError> {
    let graph = &workflow.graph;
    if graph.is_empty() {
        return Err(TransformError::EmptyGraph);
    }

    let index = WireIndex::new(graph.edges());
    let nodes = graph
        .nodes()
        .iter()
        .map(|node| {
            let (_, outputs) = catalog.ports_for(&node.node_type);
            PersistedNode {
                id: node.id.clone(),
                node_type: node.node_type.clone(),
                name: Some(node.label.clone()),
                x: Some(node.position.x.round()),
                y: Some(node.position.y.round()),
                z: JsonValue::from(LAYER),
                wires: index.wires_for(&node.id, outputs),
                extra: flatten_config(&node.id, &node.config),
            }
        })
        .collect();

    let metadata = &workflow.metadata;
    Ok(PersistedFlow {
        name: metadata.name.clone(),
        description: metadata.description.clone(),
        status: metadata.status,
        nodes,
        version: metadata.version,
    })
}

fn flatten_config(node_id: &NodeId, config: &NodeConfig) -> Map<String, JsonValue> {
    let mut flat = config.to_map();
    for reserved in RESERVED_FIELDS {
        if flat.remove(reserved).is_some() {
            warn!(node_id = %node_id, key = reserved, "Config key collides with a wire field, skipped");
        }
    }
    flat
}
