//! Connection validation: per-kind compatibility, fan-out limits, and
//! cycle detection.
//!
//! Rejections are synchronous and structural: a bad edge returns an error
//! (or `false` via `can_connect`) and nothing is mutated.

use crate::graph::graph::StrategyGraph;
use crate::graph::node::NodeKind;
use crate::ids::NodeId;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("cannot connect a node to itself")]
    SelfLoop,

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("an edge from {0} to {1} already exists")]
    DuplicateEdge(NodeId, NodeId),

    #[error("{kind:?} nodes allow at most {limit} outgoing edges")]
    FanOutExceeded { kind: NodeKind, limit: usize },

    // Field names avoid `source`, which thiserror reserves for error
    // chaining.
    #[error("{from:?} nodes cannot connect to {to:?} nodes")]
    IncompatibleKinds { from: NodeKind, to: NodeKind },

    #[error("connecting {0} to {1} would create a cycle")]
    WouldCycle(NodeId, NodeId),
}

/// Maximum outgoing edges per node kind.
pub fn fan_out_limit(kind: NodeKind) -> usize {
    match kind {
        NodeKind::Start => 1,
        NodeKind::EntrySignal => 4,
        NodeKind::ExitSignal => 4,
        NodeKind::Entry => 4,
        NodeKind::Modify => 4,
        NodeKind::Exit => 3,
        NodeKind::Alert => 1,
        NodeKind::End => 0,
        NodeKind::Retry => 1,
    }
}

/// Whether an edge from `source` kind to `target` kind is ever legal.
///
/// Entry signals feed action nodes only (entry/modify/exit class); exits
/// feed the terminal side plus the synthesized retry node; retry loops back
/// to an entry via the dashed re-entry link.
pub fn kinds_compatible(source: NodeKind, target: NodeKind) -> bool {
    match source {
        NodeKind::Start => matches!(target, NodeKind::EntrySignal),
        NodeKind::EntrySignal => {
            matches!(target, NodeKind::Entry | NodeKind::Modify | NodeKind::Exit)
        }
        NodeKind::ExitSignal => {
            matches!(target, NodeKind::Exit | NodeKind::Modify | NodeKind::Alert)
        }
        NodeKind::Entry => matches!(
            target,
            NodeKind::ExitSignal | NodeKind::Modify | NodeKind::Alert | NodeKind::End
        ),
        NodeKind::Modify => matches!(
            target,
            NodeKind::ExitSignal | NodeKind::Exit | NodeKind::Alert | NodeKind::End
        ),
        NodeKind::Exit => matches!(target, NodeKind::Retry | NodeKind::Alert | NodeKind::End),
        NodeKind::Alert => matches!(target, NodeKind::End),
        NodeKind::End => false,
        NodeKind::Retry => matches!(target, NodeKind::Entry),
    }
}

/// True if a path already exists from `from` to `to` over current edges.
///
/// Iterative DFS; the visited set is bounded by node count, O(V+E).
fn path_exists(graph: &StrategyGraph, from: NodeId, to: NodeId) -> bool {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        stack.extend(graph.successors(current));
    }
    false
}

/// Decide whether a prospective edge is legal. Checks, in order: self loop,
/// node existence, duplicate (source, target) pair, source fan-out limit,
/// kind compatibility, and acyclicity (a path from the proposed target back
/// to the proposed source means the new edge would close a cycle).
pub fn check_connect(
    graph: &StrategyGraph,
    source: NodeId,
    target: NodeId,
) -> Result<(), ConnectError> {
    if source == target {
        return Err(ConnectError::SelfLoop);
    }
    let source_node = graph.node(source).ok_or(ConnectError::UnknownNode(source))?;
    let target_node = graph.node(target).ok_or(ConnectError::UnknownNode(target))?;

    if graph.has_edge_between(source, target) {
        return Err(ConnectError::DuplicateEdge(source, target));
    }

    let kind = source_node.kind();
    let limit = fan_out_limit(kind);
    if graph.out_degree(source) >= limit {
        return Err(ConnectError::FanOutExceeded { kind, limit });
    }

    if !kinds_compatible(kind, target_node.kind()) {
        return Err(ConnectError::IncompatibleKinds {
            from: kind,
            to: target_node.kind(),
        });
    }

    if path_exists(graph, target, source) {
        return Err(ConnectError::WouldCycle(source, target));
    }

    Ok(())
}

/// Boolean view of `check_connect` for callers that only gate UI affordances.
pub fn can_connect(graph: &StrategyGraph, source: NodeId, target: NodeId) -> bool {
    check_connect(graph, source, target).is_ok()
}

/// Whole-graph acyclicity check (Kahn's algorithm), for auditing loaded
/// documents. The command layer keeps the invariant edge-by-edge; this is
/// the belt for untrusted persisted data. Synthesized dashed re-entry
/// links are excluded: they intentionally loop back to an entry node.
pub fn is_acyclic(graph: &StrategyGraph) -> bool {
    use crate::graph::edge::EdgeStyle;
    use std::collections::HashMap;

    let mut in_degree: HashMap<NodeId, usize> = graph.nodes().iter().map(|n| (n.id, 0)).collect();
    let solid: Vec<_> = graph
        .edges()
        .iter()
        .filter(|e| e.style == EdgeStyle::Solid)
        .collect();
    for edge in &solid {
        if let Some(d) = in_degree.get_mut(&edge.target) {
            *d += 1;
        }
    }
    let mut queue: Vec<NodeId> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut visited = 0usize;
    while let Some(id) = queue.pop() {
        visited += 1;
        for edge in solid.iter().filter(|e| e.source == id) {
            if let Some(d) = in_degree.get_mut(&edge.target) {
                *d -= 1;
                if *d == 0 {
                    queue.push(edge.target);
                }
            }
        }
    }
    visited == graph.nodes().len()
}

/// Nodes not reachable from the start node over solid edges, for auditing
/// loaded documents. Dashed re-entry links are not traversed; in a valid
/// strategy every node already has a solid path from the start. Without a
/// start node, every node is unreachable.
pub fn unreachable_from_start(graph: &StrategyGraph) -> Vec<NodeId> {
    use crate::graph::edge::EdgeStyle;

    let Some(start) = graph.first_of_kind(NodeKind::Start) else {
        return graph.nodes().iter().map(|n| n.id).collect();
    };
    let mut seen: HashSet<NodeId> = HashSet::new();
    seen.insert(start.id);
    let mut stack = vec![start.id];
    while let Some(current) = stack.pop() {
        for edge in graph.edges() {
            if edge.source == current && edge.style == EdgeStyle::Solid && seen.insert(edge.target)
            {
                stack.push(edge.target);
            }
        }
    }
    graph
        .nodes()
        .iter()
        .map(|n| n.id)
        .filter(|id| !seen.contains(id))
        .collect()
}
