use std::sync::Arc;

use enumset::EnumSet;
use log::trace;

use crate::column::ColRefSet;
use crate::error::OptResult;
use crate::expression::{Expression, ExpressionHandle};
use crate::operator::scalar;
use crate::operator::{Join, Operator};
use crate::operator::LogicalOperator::LogicalJoin;
use crate::operator::Operator::Logical;
use crate::optimizer::OptimizerContext;
use crate::xforms::{pattern, Pattern, PatternBuilder, Xform, XformId, XformPromise, XformResult};

fn is_inner_join(op: &Operator) -> bool {
    matches!(op, Logical(LogicalJoin(join)) if join.is_inner())
}

fn assert_inner_join(expr: &Expression, xform: XformId) {
    assert!(
        is_inner_join(expr.operator()),
        "{} doesn't match the pattern of {:?}",
        expr.operator().name(),
        xform
    );
}

lazy_static! {
    static ref JOIN_COMMUTATIVITY_PATTERN: Pattern = {
        pattern(is_inner_join)
            .leaf()
            .leaf()
            .tree()
        .finish()
    };
    static ref JOIN_ASSOCIATIVITY_PATTERN: Pattern = {
        pattern(is_inner_join)
            .pattern(is_inner_join)
                .leaf()
                .leaf()
                .tree()
            .finish()
            .leaf()
            .tree()
        .finish()
    };
}

/// Swaps the inputs of an inner join, keeping the predicate.
#[derive(Clone, Default)]
pub struct JoinCommutativity {}

impl JoinCommutativity {
    pub fn new() -> Self {
        Self {}
    }
}

impl Xform for JoinCommutativity {
    fn transform(
        &self,
        _ctx: &OptimizerContext,
        expr: &Arc<Expression>,
        result: &mut XformResult,
    ) -> OptResult<()> {
        assert_inner_join(expr, self.xform_id());
        result.add(Expression::build(
            expr.operator().clone(),
            vec![expr[1].clone(), expr[0].clone(), expr[2].clone()],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &JOIN_COMMUTATIVITY_PATTERN
    }

    fn promise(&self, _ctx: &OptimizerContext, _handle: &ExpressionHandle) -> XformPromise {
        XformPromise::Low
    }

    fn xform_id(&self) -> XformId {
        XformId::JoinCommutativity
    }

    /// Swapping twice gives the original join.
    fn incompatible_xforms(&self) -> EnumSet<XformId> {
        EnumSet::only(XformId::JoinCommutativity)
    }
}

/// Rewrites `(A join B) join C` into `(A join C) join B`.
#[derive(Clone, Default)]
pub struct JoinAssociativity {}

impl JoinAssociativity {
    pub fn new() -> Self {
        Self {}
    }
}

/// Splits conjuncts into those referencing `lower_columns` only, and the others.
pub(crate) fn partition_predicates(
    ctx: &OptimizerContext,
    conjuncts: Vec<Arc<Expression>>,
    lower_columns: &ColRefSet,
) -> OptResult<(Vec<Arc<Expression>>, Vec<Arc<Expression>>)> {
    let mut lower = vec![];
    let mut upper = vec![];
    for conjunct in conjuncts {
        ctx.check_abort()?;
        if conjunct.derive_scalar().used_columns().is_subset(lower_columns) {
            lower.push(conjunct);
        } else {
            upper.push(conjunct);
        }
    }
    Ok((lower, upper))
}

impl Xform for JoinAssociativity {
    fn transform(
        &self,
        ctx: &OptimizerContext,
        expr: &Arc<Expression>,
        result: &mut XformResult,
    ) -> OptResult<()> {
        assert_inner_join(expr, self.xform_id());
        ctx.check_abort()?;

        let lower_join = &expr[0];
        let (a, b, c) = (&lower_join[0], &lower_join[1], &expr[1]);

        let mut conjuncts = scalar::split_conjuncts(&lower_join[2]);
        conjuncts.extend(scalar::split_conjuncts(&expr[2]));
        let lower_columns = a
            .derive_relational()
            .output_columns()
            .union(c.derive_relational().output_columns());

        let (lower, upper) = partition_predicates(ctx, conjuncts, &lower_columns)?;
        if lower.is_empty() {
            trace!("No predicate joins the outer and the new inner side, skip cross product");
            return Ok(());
        }

        let new_lower = Expression::build(
            Logical(LogicalJoin(Join::inner())),
            vec![a.clone(), c.clone(), scalar::conjunction(lower)],
        );
        result.add(Expression::build(
            Logical(LogicalJoin(Join::inner())),
            vec![new_lower, b.clone(), scalar::conjunction(upper)],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &JOIN_ASSOCIATIVITY_PATTERN
    }

    /// Deep join trees and joins with a deep right input are not reordered.
    fn promise(&self, ctx: &OptimizerContext, handle: &ExpressionHandle) -> XformPromise {
        let config = ctx.config();
        let depth = handle.child_relational(0).join_depth() + handle.child_relational(1).join_depth();
        if depth > config.max_join_depth_for_associativity
            || handle.child_relational(1).join_depth() > config.max_join_right_child_depth
            || handle.child_scalar_props(2).has_subquery()
        {
            return XformPromise::None;
        }
        XformPromise::High
    }

    fn xform_id(&self) -> XformId {
        XformId::JoinAssociativity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{employee_context, employee_table, get_expr};

    #[test]
    fn test_commutativity_swaps_inputs() {
        let ctx = employee_context();
        let (a, a_cols) = get_expr(&ctx, employee_table(&ctx));
        let (b, b_cols) = get_expr(&ctx, employee_table(&ctx));
        let predicate = scalar::column_eq(a_cols[0].clone(), b_cols[2].clone());
        let join = Expression::build(
            Logical(LogicalJoin(Join::inner())),
            vec![a.clone(), b.clone(), predicate.clone()],
        );

        let xform = JoinCommutativity::new();
        let mut result = XformResult::new();
        xform.transform(&ctx, &join, &mut result).unwrap();
        let alternatives = result.results().collect::<Vec<_>>();

        assert_eq!(1, alternatives.len());
        assert!(Arc::ptr_eq(&b, &alternatives[0][0]));
        assert!(Arc::ptr_eq(&a, &alternatives[0][1]));
        assert!(alternatives[0][2].matches(&predicate));
        assert!(!xform.is_compatible(XformId::JoinCommutativity));
        assert!(xform.is_compatible(XformId::JoinAssociativity));
    }

    #[test]
    fn test_associativity_partitions_predicates() {
        let ctx = employee_context();
        let (a, a_cols) = get_expr(&ctx, employee_table(&ctx));
        let (b, b_cols) = get_expr(&ctx, employee_table(&ctx));
        let (c, c_cols) = get_expr(&ctx, employee_table(&ctx));

        let lower = Expression::build(
            Logical(LogicalJoin(Join::inner())),
            vec![a, b, scalar::column_eq(a_cols[0].clone(), b_cols[0].clone())],
        );
        let a_c = scalar::column_eq(a_cols[2].clone(), c_cols[0].clone());
        let b_c = scalar::column_eq(b_cols[2].clone(), c_cols[2].clone());
        let join = Expression::build(
            Logical(LogicalJoin(Join::inner())),
            vec![lower, c, scalar::conjunction(vec![a_c.clone(), b_c.clone()])],
        );

        let mut result = XformResult::new();
        JoinAssociativity::new()
            .transform(&ctx, &join, &mut result)
            .unwrap();
        let alternative = result.results().next().unwrap();

        assert!(alternative[0][2].matches(&a_c));
        let upper = scalar::split_conjuncts(&alternative[2]);
        assert_eq!(2, upper.len());
        assert!(upper.iter().any(|p| p.matches(&b_c)));
        assert_eq!(
            join.derive_relational().output_columns(),
            alternative.derive_relational().output_columns()
        );
    }
}
