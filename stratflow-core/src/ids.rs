use serde::{Deserialize, Serialize};
use std::fmt;

/// Expression/condition identifier, unique within one strategy session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub u64);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Graph node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Graph edge identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// Monotonic id allocator owned by a strategy session.
///
/// All expression, node, and edge ids come from here. Ids are never reused,
/// even after the owning entity is deleted, so stale references stay
/// distinguishable from fresh ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocator resumed above a persisted high-water mark; the next id
    /// handed out is `high + 1`.
    pub fn resuming_after(high: u64) -> Self {
        Self { next: high + 1 }
    }

    fn bump(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn next_expr(&mut self) -> ExprId {
        ExprId(self.bump())
    }

    pub fn next_node(&mut self) -> NodeId {
        NodeId(self.bump())
    }

    pub fn next_edge(&mut self) -> EdgeId {
        EdgeId(self.bump())
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut ids = IdGen::new();
        let a = ids.next_expr();
        let b = ids.next_node();
        let c = ids.next_edge();
        assert!(a.0 < b.0 && b.0 < c.0);
    }
}
