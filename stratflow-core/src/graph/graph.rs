//! The strategy graph: nodes, edges, and the id allocator that owns their
//! identity.
//!
//! The graph is the single writer for node/edge identity and the single
//! source of truth for position definitions; the virtual position store is
//! a derived index over it. Structural invariants (exactly one start node,
//! acyclicity, per-kind connection legality) are enforced by the validation
//! and command layers before anything is committed here.

use crate::graph::edge::Edge;
use crate::graph::node::{Node, NodeData, NodeKind, Point};
use crate::ids::{EdgeId, IdGen, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    ids: IdGen,
}

impl StrategyGraph {
    /// New graph seeded with its single start node.
    pub fn new() -> Self {
        let mut ids = IdGen::new();
        let start = Node::new(ids.next_node(), Point::new(0.0, 0.0), NodeData::Start);
        Self {
            nodes: vec![start],
            edges: Vec::new(),
            ids,
        }
    }

    /// Rebuild from persisted parts. The id allocator restarts above the
    /// highest persisted id so ids are never reused. One counter feeds
    /// node, edge, and expression ids, so the high-water mark must also
    /// cover the expression trees embedded in signal payloads.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut high = nodes
            .iter()
            .map(|n| n.id.0)
            .chain(edges.iter().map(|e| e.id.0))
            .max()
            .unwrap_or(0);
        for node in &nodes {
            if let NodeData::EntrySignal { conditions } | NodeData::ExitSignal { conditions } =
                &node.data
            {
                high = high.max(conditions.max_id());
            }
        }
        Self {
            nodes,
            edges,
            ids: IdGen::resuming_after(high),
        }
    }

    /// Bootstrap state: nothing beyond the seeded start node.
    pub fn is_bootstrap(&self) -> bool {
        self.edges.is_empty() && self.nodes.iter().all(|n| n.kind() == NodeKind::Start)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// First node of the given kind in insertion order.
    pub fn first_of_kind(&self, kind: NodeKind) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind() == kind)
    }

    pub fn has_edge_between(&self, source: NodeId, target: NodeId) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target)
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.edges.iter().filter(|e| e.source == id).count()
    }

    /// Targets reachable in one hop from `id`.
    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.source == id)
            .map(|e| e.target)
    }

    pub fn next_node_id(&mut self) -> NodeId {
        self.ids.next_node()
    }

    pub fn next_edge_id(&mut self) -> EdgeId {
        self.ids.next_edge()
    }

    pub fn id_gen_mut(&mut self) -> &mut IdGen {
        &mut self.ids
    }

    pub(crate) fn insert_node(&mut self, node: Node) {
        debug_assert!(
            self.node(node.id).is_none(),
            "node id {} already present",
            node.id
        );
        self.nodes.push(node);
    }

    pub(crate) fn insert_edge(&mut self, edge: Edge) {
        debug_assert!(
            self.node(edge.source).is_some() && self.node(edge.target).is_some(),
            "edge {} references a nonexistent node",
            edge.id
        );
        self.edges.push(edge);
    }

    /// Remove a node and every edge touching it. Returns false if the node
    /// was not present.
    pub(crate) fn remove_node(&mut self, id: NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        if self.nodes.len() == before {
            return false;
        }
        self.edges.retain(|e| e.source != id && e.target != id);
        true
    }

    pub(crate) fn remove_edge(&mut self, id: EdgeId) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != id);
        self.edges.len() != before
    }

    /// Replace node/edge contents wholesale (undo/redo restore). Ids keep
    /// allocating above their previous high-water mark.
    pub(crate) fn restore(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.nodes = nodes;
        self.edges = edges;
    }
}

impl Default for StrategyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_graph_has_exactly_one_start_node() {
        let graph = StrategyGraph::new();
        let starts = graph
            .nodes()
            .iter()
            .filter(|n| n.kind() == NodeKind::Start)
            .count();
        assert_eq!(starts, 1);
        assert!(graph.is_bootstrap());
    }

    #[test]
    fn from_parts_resumes_id_allocation_above_high_water_mark() {
        let graph = StrategyGraph::new();
        let nodes = graph.nodes().to_vec();
        let edges = graph.edges().to_vec();
        let mut restored = StrategyGraph::from_parts(nodes.clone(), edges);
        let fresh = restored.next_node_id();
        assert!(nodes.iter().all(|n| n.id != fresh));
    }

    #[test]
    fn from_parts_resumes_above_embedded_expression_ids() {
        use crate::expr::{
            CompareOp, Condition, ConditionNode, Expression, GroupCondition, GroupLogic,
        };

        // A signal payload authored last: its expression ids sit above
        // every node and edge id.
        let mut graph = StrategyGraph::new();
        let id = graph.next_node_id();
        let conditions = {
            let ids = graph.id_gen_mut();
            let lhs = Expression::number(5.0, ids);
            let rhs = Expression::number(3.0, ids);
            let c = Condition::new(lhs, CompareOp::Gt, rhs, ids);
            GroupCondition::new(GroupLogic::And, vec![ConditionNode::Single(c)], ids)
        };
        let payload_high = conditions.max_id();
        graph.insert_node(Node::new(
            id,
            Point::new(0.0, 0.0),
            NodeData::EntrySignal { conditions },
        ));

        let mut restored =
            StrategyGraph::from_parts(graph.nodes().to_vec(), graph.edges().to_vec());
        let fresh = restored.id_gen_mut().next_expr();
        assert!(fresh.0 > payload_high);
    }
}
