use std::sync::Arc;

use log::{debug, trace};

use crate::error::OptResult;
use crate::expression::{Expression, ExpressionHandle};
use crate::optimizer::OptimizerContext;
use crate::search::binding::Binding;
use crate::search::{GroupExprId, Memo};
use crate::xforms::{all_xforms, Xform, XformImpl, XformPromise, XformResult};

/// Outcome of one exploration.
#[derive(Debug)]
pub struct ExplorationResult {
    memo: Memo,
    rounds: usize,
    applied: usize,
    pruned: usize,
}

impl ExplorationResult {
    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    pub fn into_memo(self) -> Memo {
        self.memo
    }

    /// Rounds run, the last one being the round that found nothing new.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Successful transform invocations.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Transform invocations dropped because they hit an unsupported construct.
    pub fn pruned(&self) -> usize {
        self.pruned
    }
}

/// Applies xforms to every logical group expression of a memo until no new expression shows up.
///
/// Each round walks the logical group expressions present when it starts. For each one, every
/// xform not yet applied is bound against it, bindings rated [`XformPromise::None`] are skipped
/// and the rest are transformed in decreasing promise order. Results go to the group of the
/// expression they were produced from.
pub struct Explorer<'a> {
    ctx: &'a OptimizerContext,
    xforms: Vec<XformImpl>,
}

impl<'a> Explorer<'a> {
    pub fn new(ctx: &'a OptimizerContext, xforms: Vec<XformImpl>) -> Self {
        Self { ctx, xforms }
    }

    pub fn with_default_xforms(ctx: &'a OptimizerContext) -> Self {
        Self::new(ctx, all_xforms())
    }

    pub fn explore(&self, expr: &Arc<Expression>) -> OptResult<ExplorationResult> {
        let mut result = ExplorationResult {
            memo: Memo::new(),
            rounds: 0,
            applied: 0,
            pruned: 0,
        };
        result.memo.init(expr);

        let max_rounds = self.ctx.config().max_exploration_rounds;
        while result.rounds < max_rounds {
            self.ctx.check_abort()?;
            result.rounds += 1;

            let mut new_exprs = 0;
            for id in result.memo.logical_group_expr_ids() {
                new_exprs += self.explore_group_expr(id, &mut result)?;
            }
            debug!(
                "Exploration round {} added {} group expressions",
                result.rounds, new_exprs
            );
            if new_exprs == 0 {
                return Ok(result);
            }
        }

        debug!("Exploration stopped after {} rounds", max_rounds);
        Ok(result)
    }

    /// Returns the number of group expressions added.
    fn explore_group_expr(&self, id: GroupExprId, result: &mut ExplorationResult) -> OptResult<usize> {
        let mut candidates = vec![];
        for xform in &self.xforms {
            let xform_id = xform.xform_id();
            let group_expr = &result.memo[id];
            if group_expr.is_applied(xform_id) {
                continue;
            }
            if let Some(origin) = group_expr.origin() {
                if !xform.is_compatible(origin) {
                    debug!("{:?} is incompatible with {:?} of {}", xform_id, origin, id);
                    result.memo.mark_applied(id, xform_id);
                    continue;
                }
            }

            for binding in Binding::new(&result.memo, xform.pattern()).bind(id) {
                let promise = xform.promise(self.ctx, &ExpressionHandle::Expr(&binding));
                if promise == XformPromise::None {
                    trace!("{:?} is not promising for {}", xform_id, id);
                    continue;
                }
                candidates.push((promise, xform, binding));
            }
            result.memo.mark_applied(id, xform_id);
        }
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        let mut new_exprs = 0;
        for (_, xform, binding) in candidates {
            self.ctx.check_abort()?;
            let mut alternatives = XformResult::new();
            match xform.transform(self.ctx, &binding, &mut alternatives) {
                Ok(()) => result.applied += 1,
                Err(e) if e.is_unsupported() => {
                    debug!("{:?} pruned on {}: {}", xform.xform_id(), id, e);
                    result.pruned += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }

            for alternative in alternatives.results() {
                let inserted = result.memo.insert_expression(
                    &alternative,
                    Some(id.group_id),
                    Some(xform.xform_id()),
                );
                if inserted.new_expr.is_some() {
                    new_exprs += 1;
                }
            }
        }
        Ok(new_exprs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::LogicalOperator::LogicalJoin;
    use crate::operator::Operator::{Logical, Physical};
    use crate::operator::PhysicalOperator::PhysicalHashJoin;
    use crate::operator::{scalar, Join};
    use crate::test_utils::{dept_table, employee_context, employee_table, get_expr};
    use crate::xforms::{Get2TableScan, InnerJoin2HashJoin, JoinCommutativity};
    use std::sync::atomic::Ordering;

    fn join(ctx: &OptimizerContext) -> Arc<Expression> {
        let (a, a_cols) = get_expr(ctx, employee_table(ctx));
        let (b, b_cols) = get_expr(ctx, dept_table(ctx));
        Expression::build(
            Logical(LogicalJoin(Join::inner())),
            vec![a, b, scalar::column_eq(a_cols[2].clone(), b_cols[0].clone())],
        )
    }

    #[test]
    fn test_commutativity_reaches_fix_point() {
        let ctx = employee_context();
        let explorer = Explorer::new(
            &ctx,
            vec![
                JoinCommutativity::new().into(),
                InnerJoin2HashJoin::new().into(),
                Get2TableScan::new().into(),
            ],
        );
        let result = explorer.explore(&join(&ctx)).unwrap();
        let memo = result.memo();
        let root = &memo[memo.root()];

        assert_eq!(2, root.logical_exprs().count());
        assert_eq!(2, root.physical_exprs().count());
        assert!(root
            .physical_exprs()
            .all(|e| matches!(e.operator(), Physical(PhysicalHashJoin(_)))));
        assert_eq!(0, result.pruned());
        assert!(result.rounds() < ctx.config().max_exploration_rounds);
    }

    #[test]
    fn test_abort_is_observed() {
        let ctx = employee_context();
        ctx.abort_handle().store(true, Ordering::Relaxed);
        let err = Explorer::with_default_xforms(&ctx)
            .explore(&join(&ctx))
            .unwrap_err();
        assert!(matches!(err, crate::error::OptError::Aborted));
    }
}
