//! Graph nodes and their type-specific payloads.

use crate::expr::GroupCondition;
use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Node type discriminant. Closed set; connection rules and payload shape
/// are both keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Start,
    EntrySignal,
    ExitSignal,
    Entry,
    Modify,
    Exit,
    Alert,
    End,
    Retry,
}

/// Buy or sell side of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionType {
    Buy,
    Sell,
}

/// Order execution style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderType {
    Market,
    Limit,
}

/// Product category of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductType {
    Intraday,
    Delivery,
}

/// Call or put, for option legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    CE,
    PE,
}

/// Option leg details on a raw position. All fields optional: legacy
/// payloads are defaulted at recompute time, never rejected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDetails {
    pub option_type: Option<OptionType>,
    pub strike: Option<String>,
    pub expiry: Option<String>,
}

/// Partial update to option details. Merged field-by-field: a patch that
/// sets only the strike leaves the option type and expiry untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionPatch {
    pub option_type: Option<OptionType>,
    pub strike: Option<String>,
    pub expiry: Option<String>,
}

/// Re-entry configuration on an exit node or a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReEntryConfig {
    pub enabled: bool,
    pub group_number: u32,
    pub max_re_entries: u32,
}

/// Raw position payload as authored on an entry node.
///
/// This is the persisted shape; the virtual position store flattens and
/// defaults it during recompute. Optional fields absent in legacy documents
/// get documented defaults rather than a rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPosition {
    pub vpi: u32,
    pub vpt: Option<String>,
    pub priority: Option<u32>,
    pub position_type: PositionType,
    pub order_type: Option<OrderType>,
    pub limit_price: Option<f64>,
    pub lots: Option<u32>,
    pub product_type: Option<ProductType>,
    pub option_details: Option<OptionDetails>,
    pub re_entry: Option<ReEntryConfig>,
}

impl RawPosition {
    /// Minimal buy position with the given vpi; everything else defaulted
    /// at recompute.
    pub fn buy(vpi: u32) -> Self {
        Self {
            vpi,
            vpt: None,
            priority: None,
            position_type: PositionType::Buy,
            order_type: None,
            limit_price: None,
            lots: None,
            product_type: None,
            option_details: None,
            re_entry: None,
        }
    }
}

/// Partial update to one position, recorded on a modify node keyed by vpi.
///
/// Explicit fields always replace the prior value; `option_details` merges
/// nested, field-by-field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionPatch {
    pub vpt: Option<String>,
    pub priority: Option<u32>,
    pub position_type: Option<PositionType>,
    pub order_type: Option<OrderType>,
    pub limit_price: Option<f64>,
    pub lots: Option<u32>,
    pub product_type: Option<ProductType>,
    pub option_details: Option<OptionPatch>,
    pub re_entry: Option<ReEntryConfig>,
}

impl PositionPatch {
    /// Merge `other` into `self`. Explicit fields in `other` replace the
    /// prior value; `option_details` merges nested so a partial option
    /// patch does not erase unrelated option fields.
    pub fn merge(&mut self, other: &PositionPatch) {
        if other.vpt.is_some() {
            self.vpt = other.vpt.clone();
        }
        if other.priority.is_some() {
            self.priority = other.priority;
        }
        if other.position_type.is_some() {
            self.position_type = other.position_type;
        }
        if other.order_type.is_some() {
            self.order_type = other.order_type;
        }
        if other.limit_price.is_some() {
            self.limit_price = other.limit_price;
        }
        if other.lots.is_some() {
            self.lots = other.lots;
        }
        if other.product_type.is_some() {
            self.product_type = other.product_type;
        }
        if let Some(patch) = &other.option_details {
            let existing = self.option_details.get_or_insert_with(OptionPatch::default);
            if patch.option_type.is_some() {
                existing.option_type = patch.option_type;
            }
            if patch.strike.is_some() {
                existing.strike = patch.strike.clone();
            }
            if patch.expiry.is_some() {
                existing.expiry = patch.expiry.clone();
            }
        }
        if other.re_entry.is_some() {
            self.re_entry = other.re_entry;
        }
    }
}

/// Type-specific node payload. The node's kind is derived from this, so
/// kind and payload can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeData {
    Start,
    EntrySignal {
        conditions: GroupCondition,
    },
    ExitSignal {
        conditions: GroupCondition,
    },
    Entry {
        positions: Vec<RawPosition>,
        action_type: Option<String>,
    },
    Modify {
        modifications: BTreeMap<u32, PositionPatch>,
        action_type: Option<String>,
    },
    Exit {
        action_type: Option<String>,
        re_entry: Option<ReEntryConfig>,
    },
    Alert {
        message: String,
    },
    End,
    Retry {
        group_number: u32,
    },
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Start => NodeKind::Start,
            NodeData::EntrySignal { .. } => NodeKind::EntrySignal,
            NodeData::ExitSignal { .. } => NodeKind::ExitSignal,
            NodeData::Entry { .. } => NodeKind::Entry,
            NodeData::Modify { .. } => NodeKind::Modify,
            NodeData::Exit { .. } => NodeKind::Exit,
            NodeData::Alert { .. } => NodeKind::Alert,
            NodeData::End => NodeKind::End,
            NodeData::Retry { .. } => NodeKind::Retry,
        }
    }
}

/// A graph node: identity, canvas position, typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Point,
    pub data: NodeData,
}

impl Node {
    pub fn new(id: NodeId, position: Point, data: NodeData) -> Self {
        Self { id, position, data }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_derived_from_payload() {
        let data = NodeData::Exit {
            action_type: None,
            re_entry: None,
        };
        assert_eq!(data.kind(), NodeKind::Exit);
    }

    #[test]
    fn position_patch_merge_replaces_explicit_fields() {
        let mut base = PositionPatch {
            lots: Some(2),
            limit_price: Some(101.5),
            ..Default::default()
        };
        let update = PositionPatch {
            lots: Some(5),
            ..Default::default()
        };
        base.merge(&update);
        assert_eq!(base.lots, Some(5));
        // Fields absent in the update survive.
        assert_eq!(base.limit_price, Some(101.5));
    }

    #[test]
    fn option_details_merge_is_nested() {
        let mut base = PositionPatch {
            option_details: Some(OptionPatch {
                option_type: Some(OptionType::PE),
                strike: Some("ATM".to_string()),
                expiry: None,
            }),
            ..Default::default()
        };
        let update = PositionPatch {
            option_details: Some(OptionPatch {
                strike: Some("ATM+100".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        base.merge(&update);
        let merged = base.option_details.unwrap();
        assert_eq!(merged.strike.as_deref(), Some("ATM+100"));
        // A partial option patch must not erase unrelated option fields.
        assert_eq!(merged.option_type, Some(OptionType::PE));
    }
}
