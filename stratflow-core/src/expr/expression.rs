//! Expression model: the typed value-producing AST inside conditions.
//!
//! Every expression carries a session-unique id allocated by `IdGen`; callers
//! never hand-construct ids. Construction is infallible: invalid
//! configurations (a division with a vacuous operand, a reference to a
//! missing series) surface at evaluation time, not construction time.

use crate::ids::{ExprId, IdGen};
use serde::{Deserialize, Serialize};

/// Literal payload of a `Constant` expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Number(f64),
    Text(String),
}

/// Virtual position selector on `PositionData` / `ExecutionData`.
///
/// `Any` combined with a concrete tag means "match by tag"; a concrete id
/// overrides the tag and narrows to one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VpiSelector {
    Any,
    Id(u32),
}

/// Binary operation of a `Complex` expression.
///
/// `AddPercent` / `SubPercent` are not ordinary arithmetic: they mean "left
/// increased/decreased by right percent" and are special-cased before
/// generic infix handling in both the renderer and the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    AddPercent,
    SubPercent,
}

impl ComplexOp {
    /// Infix symbol for rendering. Percent ops never reach generic infix
    /// rendering; their symbols exist for diagnostics only.
    pub fn symbol(&self) -> &'static str {
        match self {
            ComplexOp::Add => "+",
            ComplexOp::Sub => "-",
            ComplexOp::Mul => "*",
            ComplexOp::Div => "/",
            ComplexOp::Mod => "%",
            ComplexOp::AddPercent => "+%",
            ComplexOp::SubPercent => "-%",
        }
    }
}

/// Closed sum of the nine expression variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExprKind {
    /// Indicator sample. Offset 0 = current sample, negative = N samples back.
    Indicator {
        name: String,
        parameter: Option<String>,
        offset: i32,
    },
    /// Raw market data field, optionally narrowed to a sub-indicator.
    MarketData {
        field: String,
        sub_indicator: Option<String>,
        offset: i32,
    },
    Constant {
        value: ConstantValue,
    },
    /// Clock-derived value (hour, minute, day of week, ...).
    TimeFunction {
        function: String,
        parameters: Vec<String>,
    },
    /// Field of one or more virtual positions, selected by vpi and/or tag.
    PositionData {
        field: String,
        vpi: Option<VpiSelector>,
        vpt: Option<String>,
    },
    StrategyMetric {
        metric: String,
    },
    ExecutionData {
        field: String,
        vpi: Option<VpiSelector>,
    },
    ExternalTrigger {
        trigger_type: String,
        parameters: Vec<String>,
    },
    /// Binary composition of two sub-expressions.
    Complex {
        operation: ComplexOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

/// Discriminant-only view of `ExprKind`, used to request a default variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprKindTag {
    Indicator,
    MarketData,
    Constant,
    TimeFunction,
    PositionData,
    StrategyMetric,
    ExecutionData,
    ExternalTrigger,
    Complex,
}

/// A typed AST node: session-unique id plus variant payload.
///
/// Subtrees are finite by construction (`Complex` owns its operands; there
/// are no back references).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub id: ExprId,
    pub kind: ExprKind,
}

impl Expression {
    /// Fresh, minimally populated expression of the requested variant.
    ///
    /// Never fails; the defaults are deliberately inert (offset 0, constant
    /// 0, empty parameter lists) and meant to be filled in by the editor.
    pub fn default_of(tag: ExprKindTag, ids: &mut IdGen) -> Self {
        let kind = match tag {
            ExprKindTag::Indicator => ExprKind::Indicator {
                name: String::new(),
                parameter: None,
                offset: 0,
            },
            ExprKindTag::MarketData => ExprKind::MarketData {
                field: "close".to_string(),
                sub_indicator: None,
                offset: 0,
            },
            ExprKindTag::Constant => ExprKind::Constant {
                value: ConstantValue::Number(0.0),
            },
            ExprKindTag::TimeFunction => ExprKind::TimeFunction {
                function: "hour".to_string(),
                parameters: Vec::new(),
            },
            ExprKindTag::PositionData => ExprKind::PositionData {
                field: "unrealizedPnl".to_string(),
                vpi: Some(VpiSelector::Any),
                vpt: None,
            },
            ExprKindTag::StrategyMetric => ExprKind::StrategyMetric {
                metric: "totalPnl".to_string(),
            },
            ExprKindTag::ExecutionData => ExprKind::ExecutionData {
                field: "fillPrice".to_string(),
                vpi: Some(VpiSelector::Any),
            },
            ExprKindTag::ExternalTrigger => ExprKind::ExternalTrigger {
                trigger_type: "webhook".to_string(),
                parameters: Vec::new(),
            },
            ExprKindTag::Complex => ExprKind::Complex {
                operation: ComplexOp::Add,
                left: Box::new(Expression::number(0.0, ids)),
                right: Box::new(Expression::number(0.0, ids)),
            },
        };
        Self {
            id: ids.next_expr(),
            kind,
        }
    }

    /// Numeric constant.
    pub fn number(value: f64, ids: &mut IdGen) -> Self {
        Self {
            id: ids.next_expr(),
            kind: ExprKind::Constant {
                value: ConstantValue::Number(value),
            },
        }
    }

    /// Text constant.
    pub fn text(value: impl Into<String>, ids: &mut IdGen) -> Self {
        Self {
            id: ids.next_expr(),
            kind: ExprKind::Constant {
                value: ConstantValue::Text(value.into()),
            },
        }
    }

    /// Indicator reference at the current sample.
    pub fn indicator(name: impl Into<String>, parameter: Option<String>, ids: &mut IdGen) -> Self {
        Self {
            id: ids.next_expr(),
            kind: ExprKind::Indicator {
                name: name.into(),
                parameter,
                offset: 0,
            },
        }
    }

    /// Market data field at the current sample.
    pub fn market(field: impl Into<String>, ids: &mut IdGen) -> Self {
        Self {
            id: ids.next_expr(),
            kind: ExprKind::MarketData {
                field: field.into(),
                sub_indicator: None,
                offset: 0,
            },
        }
    }

    /// Binary composition of two existing expressions.
    pub fn complex(operation: ComplexOp, left: Expression, right: Expression, ids: &mut IdGen) -> Self {
        Self {
            id: ids.next_expr(),
            kind: ExprKind::Complex {
                operation,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    /// Largest raw id anywhere in this subtree, operands included. Used to
    /// resume the id allocator above persisted payloads.
    pub fn max_id(&self) -> u64 {
        match &self.kind {
            ExprKind::Complex { left, right, .. } => {
                self.id.0.max(left.max_id()).max(right.max_id())
            }
            _ => self.id.0,
        }
    }

    /// Discriminant of this expression's variant.
    pub fn tag(&self) -> ExprKindTag {
        match self.kind {
            ExprKind::Indicator { .. } => ExprKindTag::Indicator,
            ExprKind::MarketData { .. } => ExprKindTag::MarketData,
            ExprKind::Constant { .. } => ExprKindTag::Constant,
            ExprKind::TimeFunction { .. } => ExprKindTag::TimeFunction,
            ExprKind::PositionData { .. } => ExprKindTag::PositionData,
            ExprKind::StrategyMetric { .. } => ExprKindTag::StrategyMetric,
            ExprKind::ExecutionData { .. } => ExprKindTag::ExecutionData,
            ExprKind::ExternalTrigger { .. } => ExprKindTag::ExternalTrigger,
            ExprKind::Complex { .. } => ExprKindTag::Complex,
        }
    }
}
