//! Graph edges.

use crate::ids::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// Visual style of an edge. `Dashed` marks the synthesized retry → entry
/// re-entry link; everything else is `Solid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeStyle {
    Solid,
    Dashed,
}

/// A directed edge. Identity for duplication checks is the
/// (source, target) pair; the id exists for addressing and removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub style: EdgeStyle,
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            style: EdgeStyle::Solid,
        }
    }

    pub fn dashed(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            style: EdgeStyle::Dashed,
        }
    }
}
