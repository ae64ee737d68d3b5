use std::sync::Arc;

use itertools::Itertools;

use crate::column::{ColRef, ColRefSet};
use crate::error::OptResult;
use crate::expression::{Expression, ExpressionHandle};
use crate::operator::LogicalOperator::{LogicalGbAgg, LogicalJoin};
use crate::operator::Operator::Logical;
use crate::operator::{equi_join_columns, scalar, GbAgg, Join, Operator};
use crate::optimizer::OptimizerContext;
use crate::xforms::{pattern, Pattern, PatternBuilder, Xform, XformId, XformPromise, XformResult};

fn is_semi_join(op: &Operator) -> bool {
    matches!(op, Logical(LogicalJoin(join)) if !join.is_inner())
}

lazy_static! {
    static ref SEMI_JOIN_PATTERN: Pattern = {
        pattern(is_semi_join)
            .leaf()
            .leaf()
            .tree()
        .finish()
    };
}

/// Inner side columns of the predicate when it is a conjunction of equalities between outer
/// and inner columns only.
fn inner_equi_columns(handle: &ExpressionHandle) -> Option<Vec<ColRef>> {
    if handle.child_scalar_props(2).has_subquery()
        || handle.child_relational(1).has_outer_references()
    {
        return None;
    }
    let predicate = handle.scalar_child(2);
    let conjuncts = scalar::split_conjuncts(&predicate).len();
    let (_, inner) = equi_join_columns(
        &predicate,
        handle.child_relational(0).output_columns(),
        handle.child_relational(1).output_columns(),
    );
    if inner.is_empty() || inner.len() != conjuncts {
        return None;
    }
    Some(inner.into_iter().unique().collect())
}

fn assert_semi_join(expr: &Expression, xform: XformId) {
    assert!(
        is_semi_join(expr.operator()),
        "{} doesn't match the pattern of {:?}",
        expr.operator().name(),
        xform
    );
}

fn inner_join(children: Vec<Arc<Expression>>) -> Arc<Expression> {
    Expression::build(Logical(LogicalJoin(Join::inner())), children)
}

fn group_by(grouping: Vec<ColRef>, input: Arc<Expression>) -> Arc<Expression> {
    Expression::build(
        Logical(LogicalGbAgg(GbAgg::new(grouping))),
        vec![input, scalar::project_list(vec![])],
    )
}

/// Turns `A semi join B` into `A join B`, grouping `B` on the predicate columns first unless
/// those already hold a key of `B`.
///
/// The alternative also outputs the columns of `B` it keeps. The semi join's group only exposes
/// the output of `A`, so those extra columns are never read above it.
#[derive(Clone, Default)]
pub struct LeftSemiJoin2InnerJoin {}

impl LeftSemiJoin2InnerJoin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Xform for LeftSemiJoin2InnerJoin {
    fn transform(
        &self,
        _ctx: &OptimizerContext,
        expr: &Arc<Expression>,
        result: &mut XformResult,
    ) -> OptResult<()> {
        assert_semi_join(expr, self.xform_id());
        let inner_columns = match inner_equi_columns(&ExpressionHandle::Expr(expr)) {
            Some(columns) => columns,
            None => return Ok(()),
        };

        let inner_set = inner_columns.iter().collect::<ColRefSet>();
        let inner = if expr[1].derive_relational().key_collection().has_key_within(&inner_set) {
            expr[1].clone()
        } else {
            group_by(inner_columns, expr[1].clone())
        };
        result.add(inner_join(vec![expr[0].clone(), inner, expr[2].clone()]));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &SEMI_JOIN_PATTERN
    }

    fn promise(&self, _ctx: &OptimizerContext, handle: &ExpressionHandle) -> XformPromise {
        match inner_equi_columns(handle) {
            Some(_) => XformPromise::High,
            None => XformPromise::None,
        }
    }

    fn xform_id(&self) -> XformId {
        XformId::LeftSemiJoin2InnerJoin
    }
}

/// Turns `A semi join B` into an inner join grouped on the output of `A`, which removes the
/// duplicates the join introduces as long as `A` has a key.
#[derive(Clone, Default)]
pub struct LeftSemiJoin2InnerJoinUnderGb {}

impl LeftSemiJoin2InnerJoinUnderGb {
    pub fn new() -> Self {
        Self {}
    }
}

impl Xform for LeftSemiJoin2InnerJoinUnderGb {
    fn transform(
        &self,
        _ctx: &OptimizerContext,
        expr: &Arc<Expression>,
        result: &mut XformResult,
    ) -> OptResult<()> {
        assert_semi_join(expr, self.xform_id());
        let outer = expr[0].derive_relational();
        if outer.key_collection().is_empty() {
            return Ok(());
        }

        let grouping = outer.output_columns().iter().cloned().collect();
        let join = inner_join(vec![expr[0].clone(), expr[1].clone(), expr[2].clone()]);
        result.add(group_by(grouping, join));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &SEMI_JOIN_PATTERN
    }

    fn promise(&self, _ctx: &OptimizerContext, handle: &ExpressionHandle) -> XformPromise {
        if handle.child_relational(0).key_collection().is_empty() {
            return XformPromise::None;
        }
        match inner_equi_columns(handle) {
            Some(_) => XformPromise::Low,
            None => XformPromise::None,
        }
    }

    fn xform_id(&self) -> XformId {
        XformId::LeftSemiJoin2InnerJoinUnderGb
    }
}
