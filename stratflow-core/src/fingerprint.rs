//! Deterministic strategy fingerprints.
//!
//! BLAKE3 over canonical JSON (serde_json orders map keys, so serialization
//! is stable). Used for history snapshot dedupe and best-effort-idempotent
//! saves.

use crate::graph::edge::Edge;
use crate::graph::node::Node;
use serde::Serialize;

#[derive(Serialize)]
struct Canonical<'a> {
    nodes: &'a [Node],
    edges: &'a [Edge],
}

/// Hash the structural content of a graph (nodes + edges, not the id
/// allocator or any transient editor state).
pub fn graph_fingerprint(nodes: &[Node], edges: &[Edge]) -> String {
    let canonical = Canonical { nodes, edges };
    // Domain types serialize infallibly; a failure here is a broken derive.
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StrategyGraph;

    #[test]
    fn fingerprint_is_stable_for_identical_graphs() {
        let a = StrategyGraph::new();
        let b = StrategyGraph::new();
        assert_eq!(
            graph_fingerprint(a.nodes(), a.edges()),
            graph_fingerprint(b.nodes(), b.edges())
        );
    }

    #[test]
    fn fingerprint_changes_when_structure_changes() {
        let a = StrategyGraph::new();
        let base = graph_fingerprint(a.nodes(), a.edges());
        let empty = graph_fingerprint(&[], &[]);
        assert_ne!(base, empty);
    }
}
