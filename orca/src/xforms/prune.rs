use std::sync::Arc;

use log::trace;

use crate::column::ColRefSet;
use crate::error::OptResult;
use crate::expression::{Expression, ExpressionHandle};
use crate::operator::LogicalOperator::{LogicalGet, LogicalProject};
use crate::operator::Operator::Logical;
use crate::operator::{Get, Project};
use crate::optimizer::OptimizerContext;
use crate::xforms::{pattern, Pattern, PatternBuilder, Xform, XformId, XformPromise, XformResult};

lazy_static! {
    static ref PROJECT_OVER_GET_PATTERN: Pattern = {
        pattern(|op| matches!(op, Logical(LogicalProject(_))))
            .pattern(|op| matches!(op, Logical(LogicalGet(_))))
            .finish()
            .tree()
        .finish()
    };
}

/// Columns of the get the project list needs, or `None` when nothing can be pruned.
fn needed_columns(handle: &ExpressionHandle) -> Option<ColRefSet> {
    let child = handle.child_relational(0);
    let available = child.output_columns();
    let used = handle
        .child_scalar_props(1)
        .used_columns()
        .intersection(available);
    if used.is_empty() || used.len() == available.len() {
        None
    } else {
        Some(used)
    }
}

/// Narrows a get under a project to the columns the project list reads.
#[derive(Clone, Default)]
pub struct PruneGetColumns {}

impl PruneGetColumns {
    pub fn new() -> Self {
        Self {}
    }
}

impl Xform for PruneGetColumns {
    fn transform(
        &self,
        _ctx: &OptimizerContext,
        expr: &Arc<Expression>,
        result: &mut XformResult,
    ) -> OptResult<()> {
        let get = match (expr.operator(), expr[0].operator()) {
            (Logical(LogicalProject(_)), Logical(LogicalGet(get))) => get,
            (op, _) => panic!("{} doesn't match the pattern of {:?}", op.name(), self.xform_id()),
        };
        let needed = match needed_columns(&ExpressionHandle::Expr(expr)) {
            Some(needed) => needed,
            None => {
                trace!("Nothing to prune below {:?}", expr);
                return Ok(());
            }
        };

        let columns = get
            .output_columns()
            .iter()
            .filter(|c| needed.contains(c))
            .cloned()
            .collect();
        let pruned = Expression::build(
            Logical(LogicalGet(Get::with_columns(get.table().clone(), columns))),
            vec![],
        );
        result.add(Expression::build(
            Logical(LogicalProject(Project::new())),
            vec![pruned, expr[1].clone()],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &PROJECT_OVER_GET_PATTERN
    }

    fn promise(&self, _ctx: &OptimizerContext, handle: &ExpressionHandle) -> XformPromise {
        match needed_columns(handle) {
            Some(_) => XformPromise::High,
            None => XformPromise::None,
        }
    }

    fn xform_id(&self) -> XformId {
        XformId::PruneGetColumns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::scalar;
    use crate::test_utils::{employee_context, employee_table, get_expr};

    #[test]
    fn test_pruned_get_loses_key() {
        let ctx = employee_context();
        let (get, cols) = get_expr(&ctx, employee_table(&ctx));
        assert_eq!(1, get.derive_relational().key_collection().len());

        let list = scalar::project_list(vec![
            scalar::project_element(cols[1].clone(), scalar::ident(cols[1].clone())),
            scalar::project_element(cols[2].clone(), scalar::ident(cols[2].clone())),
        ]);
        let project = Expression::build(Logical(LogicalProject(Project::new())), vec![get, list]);
        let xform = PruneGetColumns::new();
        assert_eq!(
            XformPromise::High,
            xform.promise(&ctx, &ExpressionHandle::Expr(&project))
        );

        let mut result = XformResult::new();
        xform.transform(&ctx, &project, &mut result).unwrap();
        let alternative = result.results().next().unwrap();
        let pruned = alternative[0].derive_relational();
        assert_eq!(2, pruned.output_columns().len());
        assert!(!pruned.output_columns().contains(&cols[0]));
        assert!(pruned.key_collection().is_empty());
        assert_eq!(
            project.derive_relational().output_columns(),
            alternative.derive_relational().output_columns()
        );
    }

    #[test]
    fn test_all_columns_used_not_promising() {
        let ctx = employee_context();
        let (get, cols) = get_expr(&ctx, employee_table(&ctx));
        let list = scalar::project_list(
            cols.iter()
                .map(|c| scalar::project_element(c.clone(), scalar::ident(c.clone())))
                .collect(),
        );
        let project = Expression::build(Logical(LogicalProject(Project::new())), vec![get, list]);
        assert_eq!(
            XformPromise::None,
            PruneGetColumns::new().promise(&ctx, &ExpressionHandle::Expr(&project))
        );
    }
}
