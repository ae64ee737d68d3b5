use std::sync::Arc;

use itertools::Itertools;

use crate::expression::Expression;
use crate::operator::PatternOperator;
use crate::search::{GroupExprId, GroupId, Memo};
use crate::xforms::{Pattern, PatternNode};

/// Extracts the expressions of a memo matching a pattern.
///
/// Relational groups reached by a leaf placeholder become group bound leaves. Scalar groups are
/// always extracted whole.
pub(crate) struct Binding<'a, 'b> {
    memo: &'a Memo,
    pattern: &'b Pattern,
}

impl<'a, 'b> Binding<'a, 'b> {
    pub(crate) fn new(memo: &'a Memo, pattern: &'b Pattern) -> Self {
        Self { memo, pattern }
    }

    /// Every binding of the pattern rooted at `group_expr_id`.
    pub(crate) fn bind(&self, group_expr_id: GroupExprId) -> Vec<Arc<Expression>> {
        self.bind_expr(group_expr_id, self.pattern)
    }

    fn bind_expr(&self, group_expr_id: GroupExprId, pattern: &Pattern) -> Vec<Arc<Expression>> {
        let group_expr = &self.memo[group_expr_id];
        if !pattern.matches_without_children(group_expr.operator()) {
            return vec![];
        }

        let inputs = group_expr.inputs();
        let child_patterns = match self.align(pattern, inputs.len()) {
            Some(patterns) => patterns,
            None => return vec![],
        };
        if inputs.is_empty() {
            return vec![Expression::build(group_expr.operator().clone(), vec![])];
        }

        inputs
            .iter()
            .zip(child_patterns)
            .map(|(group_id, child_pattern)| self.bind_group(*group_id, child_pattern))
            .multi_cartesian_product()
            .map(|children| Expression::build(group_expr.operator().clone(), children))
            .collect()
    }

    /// One pattern per input, or `None` when the input count doesn't fit.
    fn align<'p>(&self, pattern: &'p Pattern, input_count: usize) -> Option<Vec<&'p Pattern>> {
        let children = pattern.children();
        match children.last() {
            Some(last) if last.is_placeholder(PatternOperator::PatternMultiLeaf) => {
                let fixed = children.len() - 1;
                if input_count < fixed {
                    return None;
                }
                Some(
                    children[..fixed]
                        .iter()
                        .chain(std::iter::repeat(last).take(input_count - fixed))
                        .collect(),
                )
            }
            _ if children.len() == input_count => Some(children.iter().collect()),
            _ => None,
        }
    }

    fn bind_group(&self, group_id: GroupId, pattern: &Pattern) -> Vec<Arc<Expression>> {
        let group = &self.memo[group_id];
        if group.is_scalar() {
            return vec![group.scalar_expr()];
        }

        match pattern.node() {
            PatternNode::Placeholder(PatternOperator::PatternTree) => {
                vec![self.memo.extract_first(group_id)]
            }
            PatternNode::Placeholder(_) => vec![Expression::group_leaf(
                group_id,
                group.relational_props(),
                group.cached_stats(),
            )],
            PatternNode::Operator(_) => group
                .logical_exprs()
                .flat_map(|e| self.bind_expr(e.id(), pattern))
                .collect(),
        }
    }
}
