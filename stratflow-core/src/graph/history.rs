//! History/undo synchronizer: debounced snapshots of the graph.
//!
//! A snapshot is appended only when the graph has left its bootstrap state,
//! no pointer drag is in progress, and a quiet period (300 ms) has elapsed
//! since the last change. A new change supersedes the pending settle timer
//! rather than stacking on it. After the owning editor is torn down,
//! pending settles are guarded no-ops.

use crate::fingerprint::graph_fingerprint;
use crate::graph::edge::Edge;
use crate::graph::graph::StrategyGraph;
use crate::graph::node::Node;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Quiet period before a settled mutation batch becomes one snapshot.
pub const SETTLE_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// One restorable point in the edit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub fingerprint: String,
}

impl Snapshot {
    fn of(graph: &StrategyGraph) -> Self {
        Self {
            nodes: graph.nodes().to_vec(),
            edges: graph.edges().to_vec(),
            fingerprint: graph_fingerprint(graph.nodes(), graph.edges()),
        }
    }
}

/// Debounced snapshot keeper with an undo cursor.
#[derive(Debug)]
pub struct HistorySync {
    snapshots: Vec<Snapshot>,
    cursor: usize,
    quiet_period: Duration,
    last_change: Option<Instant>,
    dragging: bool,
    alive: bool,
}

impl HistorySync {
    /// Seed the history with the graph's initial state so the first undo
    /// has somewhere to land.
    pub fn new(graph: &StrategyGraph) -> Self {
        Self::with_quiet_period(graph, SETTLE_QUIET_PERIOD)
    }

    pub fn with_quiet_period(graph: &StrategyGraph, quiet_period: Duration) -> Self {
        Self {
            snapshots: vec![Snapshot::of(graph)],
            cursor: 0,
            quiet_period,
            last_change: None,
            dragging: false,
            alive: true,
        }
    }

    /// Record that the graph changed. Supersedes any pending settle timer.
    pub fn note_change(&mut self, now: Instant) {
        if self.alive {
            self.last_change = Some(now);
        }
    }

    /// Mark a continuous pointer drag. Changes made while dragging are
    /// transients and must not produce snapshots until the drag ends.
    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Whether a change is waiting for its quiet period.
    pub fn has_pending(&self) -> bool {
        self.last_change.is_some()
    }

    /// Attempt to settle the pending change into a snapshot. Returns true
    /// if a snapshot was appended.
    ///
    /// No-ops when: torn down, no pending change, still dragging, quiet
    /// period not yet elapsed, graph still in bootstrap, or the settled
    /// state is fingerprint-identical to the snapshot under the cursor.
    pub fn settle(&mut self, now: Instant, graph: &StrategyGraph) -> bool {
        if !self.alive || self.dragging {
            return false;
        }
        let Some(changed_at) = self.last_change else {
            return false;
        };
        if now.duration_since(changed_at) < self.quiet_period {
            return false;
        }
        self.last_change = None;

        if graph.is_bootstrap() {
            return false;
        }

        let snapshot = Snapshot::of(graph);
        if self.snapshots[self.cursor].fingerprint == snapshot.fingerprint {
            return false;
        }

        // A new snapshot invalidates the redo tail.
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(snapshot);
        self.cursor = self.snapshots.len() - 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Step the cursor back and return the snapshot to restore.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.snapshots[self.cursor])
    }

    /// Step the cursor forward and return the snapshot to restore.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.snapshots[self.cursor])
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Tear down: any pending settle becomes a permanent no-op.
    pub fn teardown(&mut self) {
        self.alive = false;
        self.last_change = None;
    }
}
