//! Virtual position store: a derived index over the graph's entry nodes.
//!
//! The graph is always the source of truth for position definitions; the
//! store only aggregates the runtime-visible view (open counts, re-entry
//! counters, merged modifications). Any node-data change that can affect
//! positions triggers a full `recompute` rather than an incremental patch,
//! so the store can never diverge from the graph.
//!
//! The store is an explicitly constructed object with session lifetime:
//! created when a strategy session starts, discarded when it ends.

use crate::expr::{PositionLookup, VpiSelector};
use crate::graph::node::NodeData;
use crate::graph::StrategyGraph;
use crate::positions::position::VirtualPosition;
use chrono::Utc;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct VirtualPositionStore {
    positions: Vec<VirtualPosition>,
    /// Host-supplied execution values, keyed `field:vpi` with a bare
    /// `field` fallback for vpi-agnostic values.
    execution_values: HashMap<String, f64>,
}

impl VirtualPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self) -> &[VirtualPosition] {
        &self.positions
    }

    pub fn get(&self, vpi: u32) -> Option<&VirtualPosition> {
        self.positions.iter().find(|p| p.vpi == vpi)
    }

    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a VirtualPosition> {
        self.positions
            .iter()
            .filter(move |p| p.vpt.as_deref() == Some(tag))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Full rebuild from the graph.
    ///
    /// Scans entry nodes in insertion order, flattens and defaults each raw
    /// payload, then applies every modify node's modification map in order.
    /// Patches referencing unknown vpis are orphans and are tolerated
    /// (skipped), not cleaned up. Re-entry counters survive the rebuild:
    /// they are runtime aggregation owned by the store, not derivable from
    /// the graph.
    pub fn recompute(&mut self, graph: &StrategyGraph) {
        let carried: HashMap<u32, u32> = self
            .positions
            .iter()
            .filter_map(|p| p.re_entry.map(|r| (p.vpi, r.current_count)))
            .collect();

        let now = Utc::now();
        let mut rebuilt: Vec<VirtualPosition> = Vec::new();
        for node in graph.nodes() {
            if let NodeData::Entry { positions, .. } = &node.data {
                for raw in positions {
                    rebuilt.push(VirtualPosition::from_raw(raw, node.id, now));
                }
            }
        }

        for node in graph.nodes() {
            if let NodeData::Modify { modifications, .. } = &node.data {
                for (vpi, patch) in modifications {
                    if let Some(position) = rebuilt.iter_mut().find(|p| p.vpi == *vpi) {
                        position.apply_patch(patch, now);
                    }
                    // Unknown vpi: orphaned modification, tolerated read-side.
                }
            }
        }

        for position in &mut rebuilt {
            if let Some(re_entry) = &mut position.re_entry {
                if let Some(count) = carried.get(&position.vpi) {
                    re_entry.current_count = *count;
                }
            }
        }

        self.positions = rebuilt;
    }

    /// Remove one position from the runtime view. Definitions live on the
    /// graph, so the position reappears on the next recompute unless its
    /// entry node was deleted too.
    pub fn remove(&mut self, vpi: u32) -> bool {
        let before = self.positions.len();
        self.positions.retain(|p| p.vpi != vpi);
        self.positions.len() != before
    }

    /// Bump the re-entry counter. No-op unless the position exists and has
    /// re-entry enabled; touches only the counter field.
    pub fn increment_re_entry(&mut self, vpi: u32) -> bool {
        let Some(position) = self.positions.iter_mut().find(|p| p.vpi == vpi) else {
            return false;
        };
        match &mut position.re_entry {
            Some(re_entry) if re_entry.enabled => {
                re_entry.current_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Reset the re-entry counter to zero. Same guard as increment.
    pub fn reset_re_entry(&mut self, vpi: u32) -> bool {
        let Some(position) = self.positions.iter_mut().find(|p| p.vpi == vpi) else {
            return false;
        };
        match &mut position.re_entry {
            Some(re_entry) if re_entry.enabled => {
                re_entry.current_count = 0;
                true
            }
            _ => false,
        }
    }

    /// Install a host-supplied execution value, keyed `field:vpi` or `field`.
    pub fn set_execution_value(&mut self, key: impl Into<String>, value: f64) {
        self.execution_values.insert(key.into(), value);
    }

    /// Positions selected by a vpi/tag pair, concrete id winning over tag.
    fn select<'a>(
        &'a self,
        vpi: Option<VpiSelector>,
        vpt: Option<&'a str>,
    ) -> Box<dyn Iterator<Item = &'a VirtualPosition> + 'a> {
        match (vpi, vpt) {
            (Some(VpiSelector::Id(id)), _) => {
                Box::new(self.positions.iter().filter(move |p| p.vpi == id))
            }
            (_, Some(tag)) => Box::new(self.by_tag(tag)),
            _ => Box::new(self.positions.iter()),
        }
    }
}

impl PositionLookup for VirtualPositionStore {
    fn position_field(
        &self,
        field: &str,
        vpi: Option<VpiSelector>,
        vpt: Option<&str>,
    ) -> Option<f64> {
        let mut selected = self.select(vpi, vpt).peekable();
        selected.peek()?;
        match field {
            "lots" => Some(selected.map(|p| p.lots as f64).sum()),
            "count" => Some(selected.count() as f64),
            "priority" => selected.next().map(|p| p.priority as f64),
            "limitPrice" => selected.next().and_then(|p| p.limit_price),
            "reEntryCount" => selected
                .next()
                .and_then(|p| p.re_entry.map(|r| r.current_count as f64)),
            _ => None,
        }
    }

    fn execution_field(&self, field: &str, vpi: Option<VpiSelector>) -> Option<f64> {
        if let Some(VpiSelector::Id(id)) = vpi {
            if let Some(value) = self.execution_values.get(&format!("{}:{}", field, id)) {
                return Some(*value);
            }
        }
        self.execution_values.get(field).copied()
    }
}
