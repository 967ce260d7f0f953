//! Expression evaluator.
//!
//! Evaluation is sentinel-based: arithmetic failures (division by zero,
//! missing series, unknown time function) produce `Value::Error` rather
//! than panicking or aborting, so sibling branches of a condition tree keep
//! evaluating and the failure can be shown inline.

use crate::expr::condition::{CompareOp, Condition, ConditionNode, GroupCondition, GroupLogic};
use crate::expr::expression::{ComplexOp, ConstantValue, ExprKind, Expression, VpiSelector};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::collections::HashMap;

/// Result of evaluating one expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    /// Sentinel failure value; carries a human-readable reason.
    Error(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn missing(what: &str, key: &str) -> Value {
        Value::Error(format!("missing {}: {}", what, key))
    }
}

/// Lookup seam for position and execution fields.
///
/// The virtual position store implements this; the evaluator stays
/// independent of the store's concrete type.
pub trait PositionLookup {
    /// Aggregate or single-position field value, selected by vpi/tag with
    /// the usual priority (concrete id beats tag beats all-positions).
    fn position_field(&self, field: &str, vpi: Option<VpiSelector>, vpt: Option<&str>)
        -> Option<f64>;

    /// Execution-side field (fill price, fill time, ...) for a position.
    fn execution_field(&self, field: &str, vpi: Option<VpiSelector>) -> Option<f64>;
}

/// Lookup that knows no positions; every query misses.
pub struct NoPositions;

impl PositionLookup for NoPositions {
    fn position_field(&self, _: &str, _: Option<VpiSelector>, _: Option<&str>) -> Option<f64> {
        None
    }

    fn execution_field(&self, _: &str, _: Option<VpiSelector>) -> Option<f64> {
        None
    }
}

/// Inputs for one evaluation pass.
///
/// Series are stored latest-sample-last; offset 0 reads the final element,
/// offset -n reads n samples back. Indicator keys follow the renderer's
/// convention: `name` or `name(parameter)`.
pub struct EvalContext<'a> {
    pub indicators: HashMap<String, Vec<f64>>,
    pub market: HashMap<String, Vec<f64>>,
    pub metrics: HashMap<String, f64>,
    pub triggers: HashMap<String, f64>,
    pub positions: &'a dyn PositionLookup,
    pub clock: NaiveDateTime,
}

impl<'a> EvalContext<'a> {
    pub fn new(positions: &'a dyn PositionLookup, clock: NaiveDateTime) -> Self {
        Self {
            indicators: HashMap::new(),
            market: HashMap::new(),
            metrics: HashMap::new(),
            triggers: HashMap::new(),
            positions,
            clock,
        }
    }
}

fn sample(series: &[f64], offset: i32) -> Option<f64> {
    if series.is_empty() || offset > 0 {
        return None;
    }
    let back = (-offset) as usize;
    if back >= series.len() {
        return None;
    }
    Some(series[series.len() - 1 - back])
}

fn indicator_key(name: &str, parameter: Option<&str>) -> String {
    match parameter {
        Some(p) => format!("{}({})", name, p),
        None => name.to_string(),
    }
}

fn market_key(field: &str, sub_indicator: Option<&str>) -> String {
    match sub_indicator {
        Some(sub) => format!("{}.{}", field, sub),
        None => field.to_string(),
    }
}

fn time_value(function: &str, clock: NaiveDateTime) -> Value {
    match function {
        "hour" => Value::Number(clock.hour() as f64),
        "minute" => Value::Number(clock.minute() as f64),
        "second" => Value::Number(clock.second() as f64),
        // HHMM composite, e.g. 0930 for 9:30.
        "time" => Value::Number((clock.hour() * 100 + clock.minute()) as f64),
        "dayOfWeek" => Value::Number(clock.weekday().number_from_monday() as f64),
        "dayOfMonth" => Value::Number(clock.day() as f64),
        "month" => Value::Number(clock.month() as f64),
        "year" => Value::Number(clock.year() as f64),
        other => Value::Error(format!("unknown time function: {}", other)),
    }
}

fn apply_complex(op: ComplexOp, l: f64, r: f64) -> Value {
    match op {
        ComplexOp::Add => Value::Number(l + r),
        ComplexOp::Sub => Value::Number(l - r),
        ComplexOp::Mul => Value::Number(l * r),
        ComplexOp::Div => {
            if r == 0.0 {
                Value::Error("division by zero".to_string())
            } else {
                Value::Number(l / r)
            }
        }
        ComplexOp::Mod => {
            if r == 0.0 {
                Value::Error("modulo by zero".to_string())
            } else {
                Value::Number(l % r)
            }
        }
        // `l + l * r / 100` keeps round decimal inputs exact;
        // `l * (1 + r / 100)` does not (100 +% 10 would give
        // 110.00000000000001).
        ComplexOp::AddPercent => Value::Number(l + l * r / 100.0),
        ComplexOp::SubPercent => Value::Number(l - l * r / 100.0),
    }
}

/// Evaluate one expression tree against the context.
pub fn evaluate(expr: &Expression, ctx: &EvalContext) -> Value {
    match &expr.kind {
        ExprKind::Indicator {
            name,
            parameter,
            offset,
        } => {
            let key = indicator_key(name, parameter.as_deref());
            match ctx.indicators.get(&key).and_then(|s| sample(s, *offset)) {
                Some(v) => Value::Number(v),
                None => Value::missing("indicator", &key),
            }
        }
        ExprKind::MarketData {
            field,
            sub_indicator,
            offset,
        } => {
            let key = market_key(field, sub_indicator.as_deref());
            match ctx.market.get(&key).and_then(|s| sample(s, *offset)) {
                Some(v) => Value::Number(v),
                None => Value::missing("market data", &key),
            }
        }
        ExprKind::Constant { value } => match value {
            ConstantValue::Number(n) => Value::Number(*n),
            ConstantValue::Text(t) => Value::Text(t.clone()),
        },
        ExprKind::TimeFunction { function, .. } => time_value(function, ctx.clock),
        ExprKind::PositionData { field, vpi, vpt } => {
            match ctx.positions.position_field(field, *vpi, vpt.as_deref()) {
                Some(v) => Value::Number(v),
                None => Value::missing("position field", field),
            }
        }
        ExprKind::StrategyMetric { metric } => match ctx.metrics.get(metric) {
            Some(v) => Value::Number(*v),
            None => Value::missing("strategy metric", metric),
        },
        ExprKind::ExecutionData { field, vpi } => {
            match ctx.positions.execution_field(field, *vpi) {
                Some(v) => Value::Number(v),
                None => Value::missing("execution field", field),
            }
        }
        ExprKind::ExternalTrigger { trigger_type, .. } => {
            match ctx.triggers.get(trigger_type) {
                Some(v) => Value::Number(*v),
                None => Value::missing("trigger", trigger_type),
            }
        }
        ExprKind::Complex {
            operation,
            left,
            right,
        } => {
            let lv = evaluate(left, ctx);
            let rv = evaluate(right, ctx);
            match (lv, rv) {
                (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e),
                (l, r) => match (l.as_number(), r.as_number()) {
                    (Some(l), Some(r)) => apply_complex(*operation, l, r),
                    _ => Value::Error("non-numeric operand".to_string()),
                },
            }
        }
    }
}

/// Evaluate a comparison. `Err` carries the sentinel reason from either
/// operand; text operands support only equality comparisons.
pub fn evaluate_condition(condition: &Condition, ctx: &EvalContext) -> Result<bool, String> {
    let lhs = evaluate(&condition.lhs, ctx);
    let rhs = evaluate(&condition.rhs, ctx);
    match (lhs, rhs) {
        (Value::Error(e), _) | (_, Value::Error(e)) => Err(e),
        (Value::Number(l), Value::Number(r)) => Ok(match condition.op {
            CompareOp::Gt => l > r,
            CompareOp::Lt => l < r,
            CompareOp::Ge => l >= r,
            CompareOp::Le => l <= r,
            CompareOp::Eq => l == r,
            CompareOp::Ne => l != r,
        }),
        (Value::Text(l), Value::Text(r)) => match condition.op {
            CompareOp::Eq => Ok(l == r),
            CompareOp::Ne => Ok(l != r),
            op => Err(format!("text operands do not support {}", op.symbol())),
        },
        _ => Err("mismatched operand types".to_string()),
    }
}

/// Evaluate a group.
///
/// An empty group is vacuously **true** regardless of its logic tag: an
/// empty filter must never veto a signal. This is the documented convention
/// for the whole system; the renderer's `(empty)` placeholder is unrelated.
pub fn evaluate_group(group: &GroupCondition, ctx: &EvalContext) -> Result<bool, String> {
    if group.conditions.is_empty() {
        return Ok(true);
    }
    let mut acc = matches!(group.logic, GroupLogic::And);
    for node in &group.conditions {
        let value = match node {
            ConditionNode::Single(c) => evaluate_condition(c, ctx)?,
            ConditionNode::Group(g) => evaluate_group(g, ctx)?,
        };
        match group.logic {
            GroupLogic::And => acc = acc && value,
            GroupLogic::Or => acc = acc || value,
        }
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::condition::GroupLogic;
    use crate::ids::IdGen;
    use chrono::NaiveDate;

    fn ctx(positions: &NoPositions) -> EvalContext<'_> {
        let clock = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        EvalContext::new(positions, clock)
    }

    #[test]
    fn percent_increase_evaluates_numerically() {
        let mut ids = IdGen::new();
        let none = NoPositions;
        let expr = Expression::complex(
            ComplexOp::AddPercent,
            Expression::number(100.0, &mut ids),
            Expression::number(10.0, &mut ids),
            &mut ids,
        );
        assert_eq!(evaluate(&expr, &ctx(&none)), Value::Number(110.0));
    }

    #[test]
    fn percent_decrease_evaluates_numerically() {
        let mut ids = IdGen::new();
        let none = NoPositions;
        let expr = Expression::complex(
            ComplexOp::SubPercent,
            Expression::number(200.0, &mut ids),
            Expression::number(25.0, &mut ids),
            &mut ids,
        );
        assert_eq!(evaluate(&expr, &ctx(&none)), Value::Number(150.0));
    }

    #[test]
    fn division_by_zero_is_a_sentinel_not_a_panic() {
        let mut ids = IdGen::new();
        let none = NoPositions;
        let expr = Expression::complex(
            ComplexOp::Div,
            Expression::number(1.0, &mut ids),
            Expression::number(0.0, &mut ids),
            &mut ids,
        );
        assert_eq!(
            evaluate(&expr, &ctx(&none)),
            Value::Error("division by zero".to_string())
        );
    }

    #[test]
    fn error_in_one_branch_leaves_siblings_evaluable() {
        let mut ids = IdGen::new();
        let none = NoPositions;
        let bad = Expression::complex(
            ComplexOp::Mod,
            Expression::number(7.0, &mut ids),
            Expression::number(0.0, &mut ids),
            &mut ids,
        );
        let good = Expression::number(7.0, &mut ids);
        let c = ctx(&none);
        assert!(matches!(evaluate(&bad, &c), Value::Error(_)));
        assert_eq!(evaluate(&good, &c), Value::Number(7.0));
    }

    #[test]
    fn series_offsets_read_backwards_from_latest() {
        let mut ids = IdGen::new();
        let none = NoPositions;
        let mut c = ctx(&none);
        c.market.insert("close".to_string(), vec![10.0, 11.0, 12.0]);

        let mut expr = Expression::market("close", &mut ids);
        assert_eq!(evaluate(&expr, &c), Value::Number(12.0));

        if let ExprKind::MarketData { offset, .. } = &mut expr.kind {
            *offset = -2;
        }
        assert_eq!(evaluate(&expr, &c), Value::Number(10.0));

        if let ExprKind::MarketData { offset, .. } = &mut expr.kind {
            *offset = -5;
        }
        assert!(matches!(evaluate(&expr, &c), Value::Error(_)));
    }

    #[test]
    fn time_function_reads_the_clock() {
        let mut ids = IdGen::new();
        let none = NoPositions;
        let c = ctx(&none);
        let mut expr = Expression::default_of(crate::expr::expression::ExprKindTag::TimeFunction, &mut ids);
        if let ExprKind::TimeFunction { function, .. } = &mut expr.kind {
            *function = "time".to_string();
        }
        assert_eq!(evaluate(&expr, &c), Value::Number(930.0));
    }

    #[test]
    fn empty_group_is_vacuously_true_for_both_logics() {
        let mut ids = IdGen::new();
        let none = NoPositions;
        let c = ctx(&none);
        let and_group = GroupCondition::empty(GroupLogic::And, &mut ids);
        let or_group = GroupCondition::empty(GroupLogic::Or, &mut ids);
        assert_eq!(evaluate_group(&and_group, &c), Ok(true));
        assert_eq!(evaluate_group(&or_group, &c), Ok(true));
    }

    #[test]
    fn group_logic_combines_members() {
        let mut ids = IdGen::new();
        let none = NoPositions;
        let c = ctx(&none);
        let t = Condition::new(
            Expression::number(5.0, &mut ids),
            CompareOp::Gt,
            Expression::number(3.0, &mut ids),
            &mut ids,
        );
        let f = Condition::new(
            Expression::number(2.0, &mut ids),
            CompareOp::Gt,
            Expression::number(4.0, &mut ids),
            &mut ids,
        );
        let and_group = GroupCondition::new(
            GroupLogic::And,
            vec![
                ConditionNode::Single(t.clone()),
                ConditionNode::Single(f.clone()),
            ],
            &mut ids,
        );
        let or_group = GroupCondition::new(
            GroupLogic::Or,
            vec![ConditionNode::Single(t), ConditionNode::Single(f)],
            &mut ids,
        );
        assert_eq!(evaluate_group(&and_group, &c), Ok(false));
        assert_eq!(evaluate_group(&or_group, &c), Ok(true));
    }
}
