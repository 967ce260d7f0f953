//! Trade pairs: the per-session record stream consumed by downstream
//! aggregation.
//!
//! The core emits an ordered sequence of entry/exit pairs; consumers treat
//! it as opaque and perform only arithmetic reduction (equity curve, win
//! rate, drawdown) outside this crate.

use crate::graph::node::PositionType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Why an exit happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExitReason {
    Signal,
    StopLoss,
    Target,
    SquareOff,
    ReEntryLimit,
    Manual,
}

/// Entry half of a trade pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryLeg {
    pub position_id: u32,
    pub position_type: PositionType,
    pub strike: Option<String>,
    pub buy_sell: PositionType,
    pub quantity: u32,
    pub entry_price: f64,
    pub timestamp: DateTime<Utc>,
    /// Ordinal of this entry within the session, 1-based.
    pub entry_number: u32,
    /// 0 for the original entry, then 1, 2, ... per re-entry.
    pub re_entry_number: u32,
}

/// Exit half of a trade pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitLeg {
    pub position_id: u32,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub profit_loss: f64,
    pub timestamp: DateTime<Utc>,
}

/// One completed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePair {
    pub entry: EntryLeg,
    pub exit: ExitLeg,
}

/// Per-session trade recorder.
///
/// Entries open a leg keyed by position id; a matching exit closes it into
/// a pair. Signed profit/loss is derived from the entry side: long pairs
/// gain when price rises, short pairs when it falls.
#[derive(Debug, Default)]
pub struct SessionLog {
    open: HashMap<u32, EntryLeg>,
    pairs: Vec<TradePair>,
    entry_seq: u32,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry. A re-entry for a position id that is still open
    /// replaces the stale leg (the prior entry never completed a pair).
    #[allow(clippy::too_many_arguments)]
    pub fn record_entry(
        &mut self,
        position_id: u32,
        position_type: PositionType,
        strike: Option<String>,
        quantity: u32,
        entry_price: f64,
        re_entry_number: u32,
        timestamp: DateTime<Utc>,
    ) {
        self.entry_seq += 1;
        self.open.insert(
            position_id,
            EntryLeg {
                position_id,
                position_type,
                strike,
                buy_sell: position_type,
                quantity,
                entry_price,
                timestamp,
                entry_number: self.entry_seq,
                re_entry_number,
            },
        );
    }

    /// Record an exit, completing a pair if the position id has an open
    /// entry. Exits with no matching entry are dropped (tolerated orphans).
    pub fn record_exit(
        &mut self,
        position_id: u32,
        exit_price: f64,
        exit_reason: ExitReason,
        timestamp: DateTime<Utc>,
    ) -> Option<&TradePair> {
        let entry = self.open.remove(&position_id)?;
        let direction = match entry.position_type {
            PositionType::Buy => 1.0,
            PositionType::Sell => -1.0,
        };
        let profit_loss = (exit_price - entry.entry_price) * entry.quantity as f64 * direction;
        self.pairs.push(TradePair {
            entry,
            exit: ExitLeg {
                position_id,
                exit_price,
                exit_reason,
                profit_loss,
                timestamp,
            },
        });
        self.pairs.last()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Completed pairs in completion order.
    pub fn pairs(&self) -> &[TradePair] {
        &self.pairs
    }

    /// Drain the session into its final ordered sequence.
    pub fn into_pairs(self) -> Vec<TradePair> {
        self.pairs
    }
}
