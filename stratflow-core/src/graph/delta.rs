//! Graph deltas: the atomic unit of mutation.
//!
//! Commands never touch the graph directly. They produce a list of deltas
//! which one committer applies as a unit, so a side-effecting rule like
//! "toggling re-entry synthesizes a retry subgraph" is an inspectable value
//! before it is an applied mutation.

use crate::expr::GroupCondition;
use crate::graph::edge::Edge;
use crate::graph::graph::StrategyGraph;
use crate::graph::node::{Node, NodeData, PositionPatch, RawPosition, ReEntryConfig};
use crate::ids::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shallow, top-level patch to a node's payload.
///
/// Fields irrelevant to the node's kind are ignored rather than rejected
/// (data-shape tolerance); explicit fields replace the prior value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    pub conditions: Option<GroupCondition>,
    pub positions: Option<Vec<RawPosition>>,
    pub modifications: Option<BTreeMap<u32, PositionPatch>>,
    pub action_type: Option<String>,
    pub re_entry: Option<ReEntryConfig>,
    pub message: Option<String>,
}

impl NodePatch {
    pub fn re_entry(config: ReEntryConfig) -> Self {
        Self {
            re_entry: Some(config),
            ..Default::default()
        }
    }

    pub fn positions(positions: Vec<RawPosition>) -> Self {
        Self {
            positions: Some(positions),
            ..Default::default()
        }
    }

    pub fn conditions(conditions: GroupCondition) -> Self {
        Self {
            conditions: Some(conditions),
            ..Default::default()
        }
    }

    /// Apply to a payload in place. Shallow merge at the top level; only
    /// fields matching the payload's kind take effect.
    pub fn apply(&self, data: &mut NodeData) {
        match data {
            NodeData::Start | NodeData::End | NodeData::Retry { .. } => {}
            NodeData::EntrySignal { conditions } | NodeData::ExitSignal { conditions } => {
                if let Some(c) = &self.conditions {
                    *conditions = c.clone();
                }
            }
            NodeData::Entry {
                positions,
                action_type,
            } => {
                if let Some(p) = &self.positions {
                    *positions = p.clone();
                }
                if self.action_type.is_some() {
                    *action_type = self.action_type.clone();
                }
            }
            NodeData::Modify {
                modifications,
                action_type,
            } => {
                if let Some(m) = &self.modifications {
                    *modifications = m.clone();
                }
                if self.action_type.is_some() {
                    *action_type = self.action_type.clone();
                }
            }
            NodeData::Exit {
                action_type,
                re_entry,
            } => {
                if self.action_type.is_some() {
                    *action_type = self.action_type.clone();
                }
                if let Some(r) = &self.re_entry {
                    *re_entry = Some(*r);
                }
            }
            NodeData::Alert { message } => {
                if let Some(m) = &self.message {
                    *message = m.clone();
                }
            }
        }
    }
}

/// One atomic change to the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphDelta {
    AddNode(Node),
    AddEdge(Edge),
    PatchNode { id: NodeId, patch: NodePatch },
    RemoveNode(NodeId),
    RemoveEdge(EdgeId),
}

/// Apply a batch of deltas to the graph as one unit.
///
/// Callers validate before building deltas; a delta referencing a
/// nonexistent id here indicates a violated invariant, so development
/// builds assert while release builds skip the stale delta.
pub fn apply_deltas(graph: &mut StrategyGraph, deltas: &[GraphDelta]) {
    for delta in deltas {
        match delta {
            GraphDelta::AddNode(node) => graph.insert_node(node.clone()),
            GraphDelta::AddEdge(edge) => graph.insert_edge(edge.clone()),
            GraphDelta::PatchNode { id, patch } => {
                let node = graph.node_mut(*id);
                debug_assert!(node.is_some(), "patch targets nonexistent node {}", id);
                if let Some(node) = node {
                    patch.apply(&mut node.data);
                }
            }
            GraphDelta::RemoveNode(id) => {
                let removed = graph.remove_node(*id);
                debug_assert!(removed, "remove targets nonexistent node {}", id);
            }
            GraphDelta::RemoveEdge(id) => {
                let removed = graph.remove_edge(*id);
                debug_assert!(removed, "remove targets nonexistent edge {}", id);
            }
        }
    }
}
