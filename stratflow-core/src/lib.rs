//! StratFlow Core — strategy graphs, typed conditions, and virtual
//! positions.
//!
//! A strategy is a directed graph of typed nodes (signal detectors, order
//! actions, modifiers, terminators) whose decision logic is nested
//! boolean/arithmetic expression trees over market data, indicators,
//! position state, and time. This crate contains:
//! - The typed expression/condition AST with a deterministic renderer and
//!   a sentinel-based evaluator
//! - The strategy graph model with structural validation (single start
//!   node, acyclicity, per-kind connection rules)
//! - The command layer: delta-based mutations, the re-entry retry-subgraph
//!   synthesis, and a debounced undo/redo history
//! - The virtual position store (a derived index over entry nodes) and the
//!   trade-pair session log consumed by external aggregation

pub mod expr;
pub mod fingerprint;
pub mod graph;
pub mod ids;
pub mod persist;
pub mod positions;

pub use ids::{EdgeId, ExprId, IdGen, NodeId};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the shared domain types are Send + Sync, so a
    /// host can move an editor or store onto a worker thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<expr::Expression>();
        require_sync::<expr::Expression>();
        require_send::<expr::GroupCondition>();
        require_sync::<expr::GroupCondition>();
        require_send::<graph::StrategyGraph>();
        require_sync::<graph::StrategyGraph>();
        require_send::<graph::GraphEditor>();
        require_send::<positions::VirtualPositionStore>();
        require_sync::<positions::VirtualPositionStore>();
        require_send::<positions::TradePair>();
        require_sync::<positions::TradePair>();
        require_send::<persist::StrategyDoc>();
        require_sync::<persist::StrategyDoc>();
    }
}
