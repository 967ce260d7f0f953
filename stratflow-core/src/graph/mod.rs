//! Strategy graph: model, validation, mutation commands, history.

pub mod commands;
pub mod delta;
pub mod edge;
#[allow(clippy::module_inception)]
pub mod graph;
pub mod history;
pub mod node;
pub mod validate;

pub use commands::{CommandError, GraphEditor, MutationClass, MutationCounters, MutationState};
pub use delta::{apply_deltas, GraphDelta, NodePatch};
pub use edge::{Edge, EdgeStyle};
pub use graph::StrategyGraph;
pub use history::{HistorySync, Snapshot, SETTLE_QUIET_PERIOD};
pub use node::{
    Node, NodeData, NodeKind, OptionDetails, OptionPatch, OptionType, OrderType, Point,
    PositionPatch, PositionType, ProductType, RawPosition, ReEntryConfig,
};
pub use validate::{
    can_connect, check_connect, fan_out_limit, is_acyclic, kinds_compatible, unreachable_from_start,
    ConnectError,
};
