//! Expression and condition model: typed AST, renderer, evaluator.

pub mod condition;
pub mod eval;
pub mod expression;
pub mod render;

pub use condition::{CompareOp, Condition, ConditionNode, GroupCondition, GroupLogic};
pub use eval::{evaluate, evaluate_condition, evaluate_group, EvalContext, NoPositions, PositionLookup, Value};
pub use expression::{ComplexOp, ConstantValue, ExprKind, ExprKindTag, Expression, VpiSelector};
pub use render::{condition_to_string, expression_to_string, group_condition_to_string};
