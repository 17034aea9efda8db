//! Port resolution between the wire format and the visual model.
//!
//! The wire format records `(source, output port, target)` but never the
//! input port a wire lands on. Load reconstructs input ports
//! deterministically:
//!
//! 1. flatten every wire into a [`WireTriple`]
//! 2. group triples by target node
//! 3. sort each group by `(source id, output index)`, comparing ids
//!    byte-wise so that every client orders them identically
//! 4. the input index of a triple is its position in the sorted group
//!
//! Input indices are therefore a pure function of the set of wires: the
//! same data loads with the same handles no matter how the raw arrays are
//! ordered. Save projects edges back onto `wires` and discards the input
//! index.

use crate::edge::{GraphEdge, PortHandle};
use std::collections::HashMap;
use tracing::warn;
use wireflow_core::NodeId;

/// One wire from the persisted format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WireTriple {
    pub source: NodeId,
    pub output: usize,
    pub target: NodeId,
}

impl WireTriple {
    #[must_use]
    pub fn new(source: impl Into<NodeId>, output: usize, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            output,
            target: target.into(),
        }
    }
}

/// Flattens `(node id, wires)` pairs into triples, in node, port, then wire order.
pub fn flatten_wires<'a, I>(nodes: I) -> Vec<WireTriple>
where
    I: IntoIterator<Item = (&'a NodeId, &'a [Vec<NodeId>])>,
{
    let mut triples = Vec::new();
    for (source, wires) in nodes {
        for (output, targets) in wires.iter().enumerate() {
            triples.extend(targets.iter().map(|target| WireTriple {
                source: source.clone(),
                output,
                target: target.clone(),
            }));
        }
    }
    triples
}

/// Computes the input port index of every triple.
///
/// The returned vector is parallel to `triples`.
#[must_use]
pub fn assign_input_ports(triples: &[WireTriple]) -> Vec<usize> {
    let mut by_target: HashMap<&NodeId, Vec<usize>> = HashMap::new();
    for (position, triple) in triples.iter().enumerate() {
        by_target.entry(&triple.target).or_default().push(position);
    }

    let mut inputs = vec![0; triples.len()];
    for mut group in by_target.into_values() {
        group.sort_by(|&a, &b| {
            let (a, b) = (&triples[a], &triples[b]);
            a.source
                .as_str()
                .cmp(b.source.as_str())
                .then(a.output.cmp(&b.output))
        });
        for (input, position) in group.into_iter().enumerate() {
            inputs[position] = input;
        }
    }
    inputs
}

/// Builds one edge per triple with reconstructed input handles.
///
/// Edges keep the order of `triples`, so a later Save emits wires in
/// their original order.
#[must_use]
pub fn resolve_edges(triples: &[WireTriple]) -> Vec<GraphEdge> {
    let inputs = assign_input_ports(triples);
    triples
        .iter()
        .zip(inputs)
        .map(|(triple, input)| {
            GraphEdge::derived(
                &PortHandle::output(triple.source.clone(), triple.output),
                &PortHandle::input(triple.target.clone(), input),
            )
        })
        .collect()
}

/// Edges grouped by source node, for projecting back onto `wires`.
#[derive(Debug)]
pub struct WireIndex<'a> {
    by_source: HashMap<&'a NodeId, Vec<&'a GraphEdge>>,
}

impl<'a> WireIndex<'a> {
    /// Groups edges by source, keeping insertion order within each group.
    #[must_use]
    pub fn new(edges: &'a [GraphEdge]) -> Self {
        let mut by_source: HashMap<&NodeId, Vec<&GraphEdge>> = HashMap::new();
        for edge in edges {
            by_source.entry(&edge.source).or_default().push(edge);
        }
        Self { by_source }
    }

    /// Returns the `wires` array for a node with `outputs` output ports.
    ///
    /// Edges on ports outside `[0, outputs)` and edges with malformed
    /// source handles are dropped.
    #[must_use]
    pub fn wires_for(&self, node_id: &NodeId, outputs: usize) -> Vec<Vec<NodeId>> {
        let mut wires = vec![Vec::new(); outputs];
        let Some(edges) = self.by_source.get(node_id) else {
            return wires;
        };

        for edge in edges {
            match edge.output_index() {
                Ok(output) if output < outputs => wires[output].push(edge.target.clone()),
                Ok(output) => {
                    warn!(
                        edge_id = %edge.id,
                        node_id = %node_id,
                        output,
                        outputs,
                        "Dropping edge on undeclared output port"
                    );
                }
                Err(e) => {
                    warn!(edge_id = %edge.id, error = %e, "Dropping edge with bad source handle");
                }
            }
        }
        wires
    }
}
