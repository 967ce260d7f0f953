//! Virtual positions: runtime view, store, and trade-pair output.

pub mod position;
pub mod store;
pub mod trade;

pub use position::{PositionStatus, ReEntryState, VirtualPosition};
pub use store::VirtualPositionStore;
pub use trade::{EntryLeg, ExitLeg, ExitReason, SessionLog, TradePair};
