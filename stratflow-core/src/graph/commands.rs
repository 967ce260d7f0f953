//! Command layer: validated mutations over the strategy graph.
//!
//! All mutations flow through `GraphEditor`, which owns the graph, a
//! mutation-state machine, and the history synchronizer. Commands build
//! `GraphDelta` batches and hand them to one committer; derived side
//! effects (the re-entry toggle synthesizing a retry subgraph) are part of
//! the same batch and settle into one consolidated history snapshot.

use crate::expr::{GroupCondition, GroupLogic};
use crate::graph::delta::{apply_deltas, GraphDelta, NodePatch};
use crate::graph::edge::Edge;
use crate::graph::graph::StrategyGraph;
use crate::graph::history::HistorySync;
use crate::graph::node::{Node, NodeData, NodeKind, Point, PositionPatch, ReEntryConfig};
use crate::graph::validate::{check_connect, ConnectError};
use crate::ids::{EdgeId, NodeId};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Broad class of a mutation request, used by the drop/allow table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationClass {
    /// Node/edge adds and removes.
    Structural,
    /// Payload updates on existing nodes.
    Data,
}

/// Mutation lifecycle: `Idle → Mutating → Settling → Idle`.
///
/// `Mutating` exists to reject re-entrant requests triggered by a
/// mutation's own side effects; it is a cooperative guard, not a lock.
/// `Settling` covers the window between commit and the debounced history
/// snapshot, and admits new requests (which supersede the settle timer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Mutating,
    Settling,
}

impl MutationState {
    /// Drop/allow decision as a table lookup on state.
    pub fn admits(&self, _class: MutationClass) -> bool {
        match self {
            MutationState::Idle | MutationState::Settling => true,
            MutationState::Mutating => false,
        }
    }
}

/// Counts of dropped re-entrant requests, per class. Inspectable by the
/// caller; drops are recorded, not surfaced as user-facing failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationCounters {
    pub structural_dropped: u64,
    pub data_dropped: u64,
}

impl MutationCounters {
    fn bump(&mut self, class: MutationClass) {
        match class {
            MutationClass::Structural => self.structural_dropped += 1,
            MutationClass::Data => self.data_dropped += 1,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("a mutation is in flight; {0:?} request dropped")]
    InFlight(MutationClass),

    #[error(transparent)]
    Rejected(#[from] ConnectError),

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("node {id} is a {actual:?} node; expected {expected:?}")]
    WrongNodeKind {
        id: NodeId,
        actual: NodeKind,
        expected: NodeKind,
    },

    #[error("the start node cannot be deleted")]
    CannotDeleteStart,
}

/// Horizontal/vertical offset of a node spawned relative to its parent.
const CHILD_OFFSET: (f64, f64) = (220.0, 80.0);

/// Offset of a synthesized retry node relative to its exit node.
const RETRY_OFFSET: (f64, f64) = (180.0, 120.0);

/// The editor: graph + mutation FSM + history.
pub struct GraphEditor {
    graph: StrategyGraph,
    state: MutationState,
    history: HistorySync,
    dropped: MutationCounters,
}

impl GraphEditor {
    pub fn new() -> Self {
        let graph = StrategyGraph::new();
        let history = HistorySync::new(&graph);
        Self {
            graph,
            state: MutationState::Idle,
            history,
            dropped: MutationCounters::default(),
        }
    }

    /// Editor over an existing graph (e.g. loaded from persistence), with a
    /// custom settle quiet period for tests.
    pub fn with_graph_and_quiet_period(graph: StrategyGraph, quiet_period: Duration) -> Self {
        let history = HistorySync::with_quiet_period(&graph, quiet_period);
        Self {
            graph,
            state: MutationState::Idle,
            history,
            dropped: MutationCounters::default(),
        }
    }

    pub fn graph(&self) -> &StrategyGraph {
        &self.graph
    }

    /// Id allocator for building expressions/conditions destined for this
    /// graph's node payloads.
    pub fn id_gen_mut(&mut self) -> &mut crate::ids::IdGen {
        self.graph.id_gen_mut()
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    pub fn dropped(&self) -> MutationCounters {
        self.dropped
    }

    pub fn history(&self) -> &HistorySync {
        &self.history
    }

    /// Admission gate. The first node added to an otherwise-empty graph is
    /// never dropped (bootstrap exemption); everything else consults the
    /// state table.
    fn admit(&mut self, class: MutationClass, bootstrap_exempt: bool) -> Result<(), CommandError> {
        if bootstrap_exempt && self.graph.is_bootstrap() {
            return Ok(());
        }
        if !self.state.admits(class) {
            self.dropped.bump(class);
            return Err(CommandError::InFlight(class));
        }
        Ok(())
    }

    /// Commit a delta batch: apply atomically, then arm the settle timer.
    fn commit(&mut self, deltas: Vec<GraphDelta>, now: Instant) {
        self.state = MutationState::Mutating;
        apply_deltas(&mut self.graph, &deltas);
        self.state = MutationState::Settling;
        self.history.note_change(now);
    }

    /// Default payload for a freshly added node of the given kind.
    fn default_data(&mut self, kind: NodeKind) -> NodeData {
        match kind {
            NodeKind::Start => NodeData::Start,
            NodeKind::EntrySignal => NodeData::EntrySignal {
                conditions: GroupCondition::empty(GroupLogic::And, self.graph.id_gen_mut()),
            },
            NodeKind::ExitSignal => NodeData::ExitSignal {
                conditions: GroupCondition::empty(GroupLogic::And, self.graph.id_gen_mut()),
            },
            NodeKind::Entry => NodeData::Entry {
                positions: Vec::new(),
                action_type: None,
            },
            NodeKind::Modify => NodeData::Modify {
                modifications: BTreeMap::new(),
                action_type: None,
            },
            NodeKind::Exit => NodeData::Exit {
                action_type: None,
                re_entry: None,
            },
            NodeKind::Alert => NodeData::Alert {
                message: String::new(),
            },
            NodeKind::End => NodeData::End,
            NodeKind::Retry => NodeData::Retry { group_number: 1 },
        }
    }

    /// Slot for a node with no parent: a diagonal cascade below the start
    /// node so new nodes never stack exactly on top of each other.
    fn default_slot(&self) -> Point {
        let n = self.graph.nodes().len() as f64;
        Point::new(80.0 * n, 60.0 * n)
    }

    /// Add a node of the requested kind with default payload, positioned
    /// relative to `parent` if given.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        parent: Option<NodeId>,
        now: Instant,
    ) -> Result<NodeId, CommandError> {
        self.admit(MutationClass::Structural, true)?;

        let position = match parent {
            Some(pid) => {
                let parent_node = self.graph.node(pid).ok_or(CommandError::UnknownNode(pid))?;
                parent_node
                    .position
                    .offset(CHILD_OFFSET.0, CHILD_OFFSET.1)
            }
            None => self.default_slot(),
        };

        let data = self.default_data(kind);
        let id = self.graph.next_node_id();
        self.commit(vec![GraphDelta::AddNode(Node::new(id, position, data))], now);
        Ok(id)
    }

    /// Add a validated edge.
    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        now: Instant,
    ) -> Result<EdgeId, CommandError> {
        self.admit(MutationClass::Structural, false)?;
        check_connect(&self.graph, source, target)?;

        let id = self.graph.next_edge_id();
        self.commit(vec![GraphDelta::AddEdge(Edge::new(id, source, target))], now);
        Ok(id)
    }

    /// Whether toggling re-entry on this exit node should synthesize the
    /// retry subgraph. True only on a disabled→enabled transition when the
    /// exit node has no existing edge to a retry node (dedupe: a duplicate
    /// firing of the same logical toggle synthesizes nothing).
    fn re_entry_needs_synthesis(&self, node: &Node, patch: &NodePatch) -> bool {
        let Some(new_config) = &patch.re_entry else {
            return false;
        };
        if !new_config.enabled {
            return false;
        }
        let NodeData::Exit { re_entry, .. } = &node.data else {
            return false;
        };
        if matches!(re_entry, Some(r) if r.enabled) {
            return false;
        }
        // Dedupe guard: an existing exit → retry edge means the subgraph is
        // already there.
        !self.graph.successors(node.id).any(|t| {
            self.graph
                .node(t)
                .map(|n| n.kind() == NodeKind::Retry)
                .unwrap_or(false)
        })
    }

    /// Merge a shallow patch into a node's payload.
    ///
    /// Special case: a patch that flips an exit node's re-entry from
    /// disabled to enabled also synthesizes, in the same transaction, a
    /// retry node near the exit, a solid exit → retry edge, and — if any
    /// entry node exists — a dashed retry → first-entry edge. One
    /// consolidated history snapshot covers the whole batch. Toggling
    /// re-entry off never tears the retry node down; that remains an
    /// explicit delete.
    pub fn update_node_data(
        &mut self,
        id: NodeId,
        patch: NodePatch,
        now: Instant,
    ) -> Result<(), CommandError> {
        self.admit(MutationClass::Data, false)?;
        let node = self.graph.node(id).ok_or(CommandError::UnknownNode(id))?.clone();

        let mut deltas = Vec::new();

        if self.re_entry_needs_synthesis(&node, &patch) {
            let config = patch.re_entry.unwrap_or(ReEntryConfig {
                enabled: true,
                group_number: 1,
                max_re_entries: 1,
            });
            let retry_id = self.graph.next_node_id();
            let retry = Node::new(
                retry_id,
                node.position.offset(RETRY_OFFSET.0, RETRY_OFFSET.1),
                NodeData::Retry {
                    group_number: config.group_number,
                },
            );
            deltas.push(GraphDelta::AddNode(retry));

            let link = self.graph.next_edge_id();
            deltas.push(GraphDelta::AddEdge(Edge::new(link, id, retry_id)));

            if let Some(entry) = self.graph.first_of_kind(NodeKind::Entry) {
                let entry_id = entry.id;
                let re_entry_link = self.graph.next_edge_id();
                deltas.push(GraphDelta::AddEdge(Edge::dashed(
                    re_entry_link,
                    retry_id,
                    entry_id,
                )));
            }
        }

        deltas.push(GraphDelta::PatchNode { id, patch });
        self.commit(deltas, now);
        Ok(())
    }

    /// Merge one position patch into a modify node's modification map,
    /// field-by-field (nested for option details). Explicit fields replace
    /// prior values; untouched fields survive.
    pub fn record_modification(
        &mut self,
        id: NodeId,
        vpi: u32,
        patch: PositionPatch,
        now: Instant,
    ) -> Result<(), CommandError> {
        self.admit(MutationClass::Data, false)?;
        let node = self.graph.node(id).ok_or(CommandError::UnknownNode(id))?;
        let NodeData::Modify { modifications, .. } = &node.data else {
            return Err(CommandError::WrongNodeKind {
                id,
                actual: node.kind(),
                expected: NodeKind::Modify,
            });
        };

        let mut merged = modifications.clone();
        merged.entry(vpi).or_default().merge(&patch);

        self.commit(
            vec![GraphDelta::PatchNode {
                id,
                patch: NodePatch {
                    modifications: Some(merged),
                    ..Default::default()
                },
            }],
            now,
        );
        Ok(())
    }

    /// Delete a node and every edge where it is source or target. Already
    /// merged modification records elsewhere are left alone; readers
    /// tolerate orphaned position references.
    pub fn delete_node(&mut self, id: NodeId, now: Instant) -> Result<(), CommandError> {
        self.admit(MutationClass::Structural, false)?;
        let node = self.graph.node(id).ok_or(CommandError::UnknownNode(id))?;
        if node.kind() == NodeKind::Start {
            return Err(CommandError::CannotDeleteStart);
        }
        self.commit(vec![GraphDelta::RemoveNode(id)], now);
        Ok(())
    }

    /// Remove a single edge.
    pub fn delete_edge(&mut self, id: EdgeId, now: Instant) -> Result<(), CommandError> {
        self.admit(MutationClass::Structural, false)?;
        if self.graph.edge(id).is_none() {
            return Ok(());
        }
        self.commit(vec![GraphDelta::RemoveEdge(id)], now);
        Ok(())
    }

    /// Reposition a node. Drag transients bypass the delta layer; the
    /// history synchronizer suppresses snapshots while a drag is active.
    pub fn move_node(&mut self, id: NodeId, position: Point, now: Instant) {
        if let Some(node) = self.graph.node_mut(id) {
            node.position = position;
            self.history.note_change(now);
        }
    }

    pub fn begin_drag(&mut self) {
        self.history.set_dragging(true);
    }

    pub fn end_drag(&mut self, now: Instant) {
        self.history.set_dragging(false);
        self.history.note_change(now);
    }

    /// Drive the settle timer. Returns true if a history snapshot was
    /// appended. Also walks the FSM back to `Idle` once nothing is pending.
    pub fn settle(&mut self, now: Instant) -> bool {
        let pushed = self.history.settle(now, &self.graph);
        if self.state == MutationState::Settling && !self.history.has_pending() {
            self.state = MutationState::Idle;
        }
        pushed
    }

    /// Restore the previous snapshot, if any.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        let (nodes, edges) = (snapshot.nodes.clone(), snapshot.edges.clone());
        self.graph.restore(nodes, edges);
        true
    }

    /// Restore the next snapshot, if any.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        let (nodes, edges) = (snapshot.nodes.clone(), snapshot.edges.clone());
        self.graph.restore(nodes, edges);
        true
    }

    /// Tear down the editor: pending settles become no-ops.
    pub fn teardown(&mut self) {
        self.history.teardown();
        self.state = MutationState::Idle;
    }

    #[cfg(test)]
    pub(crate) fn force_state(&mut self, state: MutationState) {
        self.state = state;
    }
}

impl Default for GraphEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> Instant {
        Instant::now()
    }

    #[test]
    fn mutating_state_drops_requests_and_counts_them() {
        let mut editor = GraphEditor::new();
        let now = t0();
        // Leave bootstrap first so the exemption does not apply.
        let sig = editor.add_node(NodeKind::EntrySignal, None, now).unwrap();

        editor.force_state(MutationState::Mutating);
        let err = editor.add_node(NodeKind::Entry, None, now).unwrap_err();
        assert_eq!(err, CommandError::InFlight(MutationClass::Structural));
        let err = editor
            .update_node_data(sig, NodePatch::default(), now)
            .unwrap_err();
        assert_eq!(err, CommandError::InFlight(MutationClass::Data));
        assert_eq!(
            editor.dropped(),
            MutationCounters {
                structural_dropped: 1,
                data_dropped: 1
            }
        );
    }

    #[test]
    fn bootstrap_add_is_never_dropped() {
        let mut editor = GraphEditor::new();
        editor.force_state(MutationState::Mutating);
        // First real node into an otherwise-empty graph: exempt.
        assert!(editor.add_node(NodeKind::EntrySignal, None, t0()).is_ok());
    }

    #[test]
    fn settling_admits_new_mutations() {
        let mut editor = GraphEditor::new();
        let now = t0();
        editor.add_node(NodeKind::EntrySignal, None, now).unwrap();
        assert_eq!(editor.state(), MutationState::Settling);
        assert!(editor.add_node(NodeKind::Entry, None, now).is_ok());
    }

    #[test]
    fn child_nodes_spawn_offset_from_their_parent() {
        let mut editor = GraphEditor::new();
        let now = t0();
        let parent = editor.add_node(NodeKind::EntrySignal, None, now).unwrap();
        let child = editor.add_node(NodeKind::Entry, Some(parent), now).unwrap();
        let parent_pos = editor.graph().node(parent).unwrap().position;
        let child_pos = editor.graph().node(child).unwrap().position;
        assert_eq!(child_pos.x, parent_pos.x + CHILD_OFFSET.0);
        assert_eq!(child_pos.y, parent_pos.y + CHILD_OFFSET.1);
    }

    #[test]
    fn record_modification_rejects_non_modify_nodes() {
        let mut editor = GraphEditor::new();
        let now = t0();
        let entry = editor.add_node(NodeKind::Entry, None, now).unwrap();
        let err = editor
            .record_modification(entry, 1, PositionPatch::default(), now)
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::WrongNodeKind {
                id: entry,
                actual: NodeKind::Entry,
                expected: NodeKind::Modify,
            }
        );
    }

    #[test]
    fn settle_returns_fsm_to_idle() {
        let mut editor = GraphEditor::new();
        let now = t0();
        editor.add_node(NodeKind::EntrySignal, None, now).unwrap();
        assert_eq!(editor.state(), MutationState::Settling);
        editor.settle(now + Duration::from_millis(301));
        assert_eq!(editor.state(), MutationState::Idle);
    }
}
