//! Condition model: comparisons of two expressions and AND/OR groups.

use crate::expr::expression::Expression;
use crate::ids::{ExprId, IdGen};
use serde::{Deserialize, Serialize};

/// Comparison operator between two expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }
}

/// A single comparison between two expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ExprId,
    pub lhs: Expression,
    pub op: CompareOp,
    pub rhs: Expression,
}

impl Condition {
    /// Empty condition: `0 > 0`, meant to have its operands replaced.
    pub fn empty(ids: &mut IdGen) -> Self {
        let lhs = Expression::number(0.0, ids);
        let rhs = Expression::number(0.0, ids);
        Self {
            id: ids.next_expr(),
            lhs,
            op: CompareOp::Gt,
            rhs,
        }
    }

    pub fn new(lhs: Expression, op: CompareOp, rhs: Expression, ids: &mut IdGen) -> Self {
        Self {
            id: ids.next_expr(),
            lhs,
            op,
            rhs,
        }
    }

    /// Largest raw id in this condition, operand subtrees included.
    pub fn max_id(&self) -> u64 {
        self.id.0.max(self.lhs.max_id()).max(self.rhs.max_id())
    }
}

/// Boolean connective of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupLogic {
    And,
    Or,
}

impl GroupLogic {
    pub fn keyword(&self) -> &'static str {
        match self {
            GroupLogic::And => "AND",
            GroupLogic::Or => "OR",
        }
    }
}

/// One member of a group: a leaf comparison or a nested group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConditionNode {
    Single(Condition),
    Group(GroupCondition),
}

/// Recursive AND/OR combination of conditions.
///
/// An empty group is representable. During evaluation it is vacuously true
/// regardless of its logic tag (see `expr::eval`); the renderer displays it
/// as the literal `(empty)` placeholder, which carries no truth value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCondition {
    pub id: ExprId,
    pub logic: GroupLogic,
    pub conditions: Vec<ConditionNode>,
}

impl GroupCondition {
    pub fn empty(logic: GroupLogic, ids: &mut IdGen) -> Self {
        Self {
            id: ids.next_expr(),
            logic,
            conditions: Vec::new(),
        }
    }

    pub fn new(logic: GroupLogic, conditions: Vec<ConditionNode>, ids: &mut IdGen) -> Self {
        Self {
            id: ids.next_expr(),
            logic,
            conditions,
        }
    }

    pub fn push(&mut self, node: ConditionNode) {
        self.conditions.push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Largest raw id in this group, members and nested groups included.
    pub fn max_id(&self) -> u64 {
        let mut high = self.id.0;
        for node in &self.conditions {
            high = high.max(match node {
                ConditionNode::Single(c) => c.max_id(),
                ConditionNode::Group(g) => g.max_id(),
            });
        }
        high
    }
}
