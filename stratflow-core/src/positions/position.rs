//! Virtual positions: the flattened, defaulted runtime view of entry-node
//! payloads.

use crate::graph::node::{
    OptionDetails, OptionType, OrderType, PositionPatch, PositionType, ProductType, RawPosition,
};
use crate::ids::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Runtime status of a virtual position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionStatus {
    Pending,
    Open,
    Closed,
}

/// Re-entry bookkeeping on one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReEntryState {
    pub enabled: bool,
    pub current_count: u32,
    pub max_re_entries: u32,
    pub group_number: u32,
}

impl ReEntryState {
    pub fn can_re_enter(&self) -> bool {
        self.enabled && self.current_count < self.max_re_entries
    }
}

/// A tracked virtual position.
///
/// Built by the store from a `RawPosition`, with documented defaults for
/// absent fields: market order, 1 lot, intraday, priority 1, and CE when
/// option details are present without an option type. Legacy payloads are
/// defaulted, never rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualPosition {
    pub vpi: u32,
    pub vpt: Option<String>,
    pub priority: u32,
    pub position_type: PositionType,
    pub order_type: OrderType,
    pub limit_price: Option<f64>,
    pub lots: u32,
    pub product_type: ProductType,
    pub source_node: NodeId,
    pub option_details: Option<OptionDetails>,
    pub re_entry: Option<ReEntryState>,
    pub status: PositionStatus,
    pub rolled_out: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl VirtualPosition {
    /// Flatten a raw payload, applying field defaults.
    pub fn from_raw(raw: &RawPosition, source_node: NodeId, now: DateTime<Utc>) -> Self {
        let option_details = raw.option_details.clone().map(|mut details| {
            if details.option_type.is_none() {
                details.option_type = Some(OptionType::CE);
            }
            details
        });
        Self {
            vpi: raw.vpi,
            vpt: raw.vpt.clone(),
            priority: raw.priority.unwrap_or(1),
            position_type: raw.position_type,
            order_type: raw.order_type.unwrap_or(OrderType::Market),
            limit_price: raw.limit_price,
            lots: raw.lots.unwrap_or(1),
            product_type: raw.product_type.unwrap_or(ProductType::Intraday),
            source_node,
            option_details,
            re_entry: raw.re_entry.map(|config| ReEntryState {
                enabled: config.enabled,
                current_count: 0,
                max_re_entries: config.max_re_entries,
                group_number: config.group_number,
            }),
            status: PositionStatus::Pending,
            rolled_out: false,
            last_updated: Some(now),
        }
    }

    /// Apply a modification patch. Explicit fields replace the prior value;
    /// option details merge nested so a partial option update keeps
    /// unrelated option fields.
    pub fn apply_patch(&mut self, patch: &PositionPatch, now: DateTime<Utc>) {
        if patch.vpt.is_some() {
            self.vpt = patch.vpt.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(position_type) = patch.position_type {
            self.position_type = position_type;
        }
        if let Some(order_type) = patch.order_type {
            self.order_type = order_type;
        }
        if patch.limit_price.is_some() {
            self.limit_price = patch.limit_price;
        }
        if let Some(lots) = patch.lots {
            self.lots = lots;
        }
        if let Some(product_type) = patch.product_type {
            self.product_type = product_type;
        }
        if let Some(option_patch) = &patch.option_details {
            let details = self
                .option_details
                .get_or_insert_with(OptionDetails::default);
            if option_patch.option_type.is_some() {
                details.option_type = option_patch.option_type;
            }
            if option_patch.strike.is_some() {
                details.strike = option_patch.strike.clone();
            }
            if option_patch.expiry.is_some() {
                details.expiry = option_patch.expiry.clone();
            }
            if details.option_type.is_none() {
                details.option_type = Some(OptionType::CE);
            }
        }
        if let Some(config) = patch.re_entry {
            let current = self.re_entry.map(|r| r.current_count).unwrap_or(0);
            self.re_entry = Some(ReEntryState {
                enabled: config.enabled,
                current_count: current,
                max_re_entries: config.max_re_entries,
                group_number: config.group_number,
            });
        }
        self.last_updated = Some(now);
    }
}
