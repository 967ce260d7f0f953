//! Renderer contract tests: exact display strings for conditions, groups,
//! and percent operations.

use stratflow_core::expr::{
    condition_to_string, evaluate, expression_to_string, group_condition_to_string, CompareOp,
    ComplexOp, Condition, ConditionNode, EvalContext, Expression, GroupCondition, GroupLogic,
    NoPositions, Value,
};
use stratflow_core::IdGen;

#[test]
fn empty_condition_with_constants_renders_five_gt_three() {
    let mut ids = IdGen::new();
    // Start from the empty condition and replace its operands, the way the
    // editor does it.
    let mut condition = Condition::empty(&mut ids);
    condition.lhs = Expression::number(5.0, &mut ids);
    condition.rhs = Expression::number(3.0, &mut ids);
    condition.op = CompareOp::Gt;
    assert_eq!(condition_to_string(&condition), "5 > 3");
}

#[test]
fn empty_group_renders_the_placeholder() {
    let mut ids = IdGen::new();
    let group = GroupCondition::empty(GroupLogic::And, &mut ids);
    assert_eq!(group_condition_to_string(&group), "(empty)");
}

#[test]
fn and_group_of_two_numeric_conditions_joins_with_the_keyword() {
    let mut ids = IdGen::new();
    let first = Condition::new(
        Expression::number(5.0, &mut ids),
        CompareOp::Gt,
        Expression::number(3.0, &mut ids),
        &mut ids,
    );
    let second = Condition::new(
        Expression::number(2.0, &mut ids),
        CompareOp::Lt,
        Expression::number(4.0, &mut ids),
        &mut ids,
    );
    let group = GroupCondition::new(
        GroupLogic::And,
        vec![ConditionNode::Single(first), ConditionNode::Single(second)],
        &mut ids,
    );
    assert_eq!(group_condition_to_string(&group), "5 > 3 AND 2 < 4");
}

#[test]
fn percent_increase_renders_and_evaluates() {
    let mut ids = IdGen::new();
    let expr = Expression::complex(
        ComplexOp::AddPercent,
        Expression::number(100.0, &mut ids),
        Expression::number(10.0, &mut ids),
        &mut ids,
    );
    assert_eq!(expression_to_string(&expr), "(100 increased by 10%)");

    let positions = NoPositions;
    let clock = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    let ctx = EvalContext::new(&positions, clock);
    assert_eq!(evaluate(&expr, &ctx), Value::Number(110.0));
}

#[test]
fn rendering_never_mutates_the_expression() {
    let mut ids = IdGen::new();
    let expr = Expression::complex(
        ComplexOp::Div,
        Expression::indicator("EMA", Some("21".to_string()), &mut ids),
        Expression::number(0.0, &mut ids),
        &mut ids,
    );
    let before = expr.clone();
    let first = expression_to_string(&expr);
    let second = expression_to_string(&expr);
    assert_eq!(first, second);
    assert_eq!(expr, before);
}
