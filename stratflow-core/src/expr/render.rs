//! Renderer: deterministic projection of expressions and conditions into
//! display strings.
//!
//! This module is the only sanctioned source of display text for the AST;
//! no other component re-derives strings from expression trees. All
//! functions are pure, total, and single-pass over the tree.

use crate::expr::condition::{Condition, ConditionNode, GroupCondition};
use crate::expr::expression::{ComplexOp, ConstantValue, ExprKind, Expression, VpiSelector};
/// Render a numeric constant without a trailing `.0` for integral values,
/// so `5` renders as `5` and `2.5` as `2.5`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Wrap a field name with its offset qualifier. Offset 0 (or positive,
/// which the editor never produces) renders the bare field.
fn with_offset(base: &str, offset: i32) -> String {
    match offset {
        -1 => format!("Previous {}", base),
        n if n < -1 => format!("{} ({} candles ago)", base, -n),
        _ => base.to_string(),
    }
}

/// Position selector qualifier, in priority order: a concrete vpi beats a
/// tag even when both are present; `Any` with a tag matches by tag; `Any`
/// alone means all positions.
fn position_qualifier(vpi: Option<VpiSelector>, vpt: Option<&str>) -> Option<String> {
    match (vpi, vpt) {
        (Some(VpiSelector::Id(id)), _) => Some(format!("(ID:{})", id)),
        (_, Some(tag)) => Some(format!("(Tag:{})", tag)),
        (Some(VpiSelector::Any), None) => Some("(All Positions)".to_string()),
        (None, None) => None,
    }
}

/// Render one expression tree.
pub fn expression_to_string(expr: &Expression) -> String {
    match &expr.kind {
        ExprKind::Indicator {
            name,
            parameter,
            offset,
        } => {
            let base = match parameter {
                Some(p) => format!("{}({})", name, p),
                None => name.clone(),
            };
            with_offset(&base, *offset)
        }
        ExprKind::MarketData {
            field,
            sub_indicator,
            offset,
        } => {
            let base = match sub_indicator {
                Some(sub) => format!("{}.{}", field, sub),
                None => field.clone(),
            };
            with_offset(&base, *offset)
        }
        ExprKind::Constant { value } => match value {
            ConstantValue::Number(n) => format_number(*n),
            ConstantValue::Text(t) => t.clone(),
        },
        ExprKind::TimeFunction {
            function,
            parameters,
        } => {
            if parameters.is_empty() {
                function.clone()
            } else {
                format!("{}({})", function, parameters.join(","))
            }
        }
        ExprKind::PositionData { field, vpi, vpt } => {
            match position_qualifier(*vpi, vpt.as_deref()) {
                Some(q) => format!("{} {}", field, q),
                None => field.clone(),
            }
        }
        ExprKind::StrategyMetric { metric } => metric.clone(),
        ExprKind::ExecutionData { field, vpi } => match position_qualifier(*vpi, None) {
            Some(q) => format!("{} {}", field, q),
            None => field.clone(),
        },
        ExprKind::ExternalTrigger {
            trigger_type,
            parameters,
        } => {
            if parameters.is_empty() {
                trigger_type.clone()
            } else {
                format!("{}({})", trigger_type, parameters.join(","))
            }
        }
        ExprKind::Complex {
            operation,
            left,
            right,
        } => {
            let l = expression_to_string(left);
            let r = expression_to_string(right);
            // Percent ops are phrased, not infixed.
            match operation {
                ComplexOp::AddPercent => format!("({} increased by {}%)", l, r),
                ComplexOp::SubPercent => format!("({} decreased by {}%)", l, r),
                op => format!("({} {} {})", l, op.symbol(), r),
            }
        }
    }
}

/// Render a single comparison, e.g. `5 > 3`.
pub fn condition_to_string(condition: &Condition) -> String {
    format!(
        "{} {} {}",
        expression_to_string(&condition.lhs),
        condition.op.symbol(),
        expression_to_string(&condition.rhs)
    )
}

/// Render a group. An empty group renders the literal `(empty)` placeholder;
/// this is display-only and carries no truth value. Nested groups are
/// parenthesized; the outermost group is not.
pub fn group_condition_to_string(group: &GroupCondition) -> String {
    if group.conditions.is_empty() {
        return "(empty)".to_string();
    }
    let mut out = String::new();
    for (i, node) in group.conditions.iter().enumerate() {
        if i > 0 {
            out.push(' ');
            out.push_str(group.logic.keyword());
            out.push(' ');
        }
        match node {
            ConditionNode::Single(c) => out.push_str(&condition_to_string(c)),
            ConditionNode::Group(g) => {
                out.push('(');
                out.push_str(&group_condition_to_string(g));
                out.push(')');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::condition::{CompareOp, GroupLogic};
    use crate::expr::expression::ExprKindTag;
    use crate::ids::IdGen;

    #[test]
    fn integral_constants_render_without_decimal_point() {
        let mut ids = IdGen::new();
        assert_eq!(expression_to_string(&Expression::number(5.0, &mut ids)), "5");
        assert_eq!(expression_to_string(&Expression::number(2.5, &mut ids)), "2.5");
    }

    #[test]
    fn offsets_render_in_natural_language() {
        let mut ids = IdGen::new();
        let mut expr = Expression::indicator("RSI", Some("14".to_string()), &mut ids);
        assert_eq!(expression_to_string(&expr), "RSI(14)");

        if let ExprKind::Indicator { offset, .. } = &mut expr.kind {
            *offset = -1;
        }
        assert_eq!(expression_to_string(&expr), "Previous RSI(14)");

        if let ExprKind::Indicator { offset, .. } = &mut expr.kind {
            *offset = -3;
        }
        assert_eq!(expression_to_string(&expr), "RSI(14) (3 candles ago)");
    }

    #[test]
    fn position_qualifiers_respect_priority() {
        let mut ids = IdGen::new();
        let mut expr = Expression::default_of(ExprKindTag::PositionData, &mut ids);

        if let ExprKind::PositionData { vpi, vpt, .. } = &mut expr.kind {
            *vpi = Some(VpiSelector::Any);
            *vpt = None;
        }
        assert_eq!(
            expression_to_string(&expr),
            "unrealizedPnl (All Positions)"
        );

        if let ExprKind::PositionData { vpt, .. } = &mut expr.kind {
            *vpt = Some("hedge".to_string());
        }
        assert_eq!(expression_to_string(&expr), "unrealizedPnl (Tag:hedge)");

        // Concrete id wins even when a tag is also present.
        if let ExprKind::PositionData { vpi, .. } = &mut expr.kind {
            *vpi = Some(VpiSelector::Id(2));
        }
        assert_eq!(expression_to_string(&expr), "unrealizedPnl (ID:2)");
    }

    #[test]
    fn percent_operations_render_as_phrases() {
        let mut ids = IdGen::new();
        let l = Expression::number(100.0, &mut ids);
        let r = Expression::number(10.0, &mut ids);
        let expr = Expression::complex(ComplexOp::AddPercent, l, r, &mut ids);
        assert_eq!(expression_to_string(&expr), "(100 increased by 10%)");

        let l = Expression::number(50.0, &mut ids);
        let r = Expression::number(5.0, &mut ids);
        let expr = Expression::complex(ComplexOp::SubPercent, l, r, &mut ids);
        assert_eq!(expression_to_string(&expr), "(50 decreased by 5%)");
    }

    #[test]
    fn ordinary_operations_render_infix() {
        let mut ids = IdGen::new();
        let l = Expression::market("close", &mut ids);
        let r = Expression::number(2.0, &mut ids);
        let expr = Expression::complex(ComplexOp::Mul, l, r, &mut ids);
        assert_eq!(expression_to_string(&expr), "(close * 2)");
    }

    #[test]
    fn conditions_and_groups_compose() {
        let mut ids = IdGen::new();
        let c1 = Condition::new(
            Expression::number(5.0, &mut ids),
            CompareOp::Gt,
            Expression::number(3.0, &mut ids),
            &mut ids,
        );
        assert_eq!(condition_to_string(&c1), "5 > 3");

        let c2 = Condition::new(
            Expression::number(2.0, &mut ids),
            CompareOp::Lt,
            Expression::number(4.0, &mut ids),
            &mut ids,
        );
        let group = GroupCondition::new(
            GroupLogic::And,
            vec![ConditionNode::Single(c1), ConditionNode::Single(c2)],
            &mut ids,
        );
        assert_eq!(group_condition_to_string(&group), "5 > 3 AND 2 < 4");
    }

    #[test]
    fn empty_group_renders_placeholder() {
        let mut ids = IdGen::new();
        let group = GroupCondition::empty(GroupLogic::And, &mut ids);
        assert_eq!(group_condition_to_string(&group), "(empty)");
    }

    #[test]
    fn nested_groups_are_parenthesized() {
        let mut ids = IdGen::new();
        let c1 = Condition::new(
            Expression::number(1.0, &mut ids),
            CompareOp::Eq,
            Expression::number(1.0, &mut ids),
            &mut ids,
        );
        let inner = GroupCondition::new(
            GroupLogic::Or,
            vec![ConditionNode::Single(c1.clone())],
            &mut ids,
        );
        let outer = GroupCondition::new(
            GroupLogic::And,
            vec![ConditionNode::Single(c1), ConditionNode::Group(inner)],
            &mut ids,
        );
        assert_eq!(group_condition_to_string(&outer), "1 == 1 AND (1 == 1)");
    }
}
