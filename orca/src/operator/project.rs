use std::collections::HashMap;
use std::fmt::Formatter;

use crate::column::{ColRef, ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::expression::{Expression, ExpressionHandle};
use crate::operator::scalar::{self, ScalarOperator};
use crate::operator::{
    Arity, DerivePropContext, DerivePropResult, DisplayFields, Operator, PhysicalOperatorTrait,
    RelationalOperatorTrait, RemapColumns,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{KeyCollection, MaxCard, PropConstraint};
use crate::stats::Statistics;

/// Computes the project list in its second child over the rows of its first child.
///
/// The output is exactly the columns defined by the project list. Input columns are passed
/// through by elements of the form `c := c`.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct Project {}

impl Project {
    pub fn new() -> Self {
        Self {}
    }
}

/// Input column to defined column, for elements that merely rename or pass a column.
fn renamed_columns(project_list: &Expression) -> HashMap<ColRef, ColRef> {
    project_list
        .children()
        .iter()
        .filter_map(|element| match element.operator() {
            Operator::Scalar(ScalarOperator::ScalarProjectElement(pe)) => {
                scalar::column_of(&element[0]).map(|input| (input.clone(), pe.column().clone()))
            }
            _ => None,
        })
        .collect()
}

impl RelationalOperatorTrait for Project {
    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }

    fn scalar_child_count(&self) -> usize {
        1
    }

    fn derive_output_columns(&self, handle: &ExpressionHandle) -> ColRefSet {
        handle.child_scalar_props(1).defined_columns().clone()
    }

    fn derive_not_null_columns(&self, handle: &ExpressionHandle, _output: &ColRefSet) -> ColRefSet {
        let input = handle.child_relational(0);
        renamed_columns(&handle.scalar_child(1))
            .into_iter()
            .filter(|(from, _)| input.not_null_columns().contains(from))
            .map(|(_, to)| to)
            .collect()
    }

    fn derive_key_collection(&self, handle: &ExpressionHandle) -> KeyCollection {
        let renamed = renamed_columns(&handle.scalar_child(1));
        handle
            .child_relational(0)
            .key_collection()
            .keys()
            .iter()
            .filter_map(|key| {
                key.iter()
                    .map(|c| renamed.get(c).cloned())
                    .collect::<Option<ColRefSet>>()
            })
            .collect()
    }

    fn derive_constraint(&self, handle: &ExpressionHandle) -> PropConstraint {
        let output = self.derive_output_columns(handle);
        handle.derive_constraint_pass_through(0).restrict(&output)
    }

    fn derive_max_card(&self, handle: &ExpressionHandle) -> MaxCard {
        handle.derive_max_card_pass_through(0)
    }

    fn derive_stats(
        &self,
        handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        Ok((*handle.child_stats(0, ctx)?).clone())
    }
}

impl PhysicalOperatorTrait for Project {
    fn derive_properties(&self, context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::pass_through(&context, 1)])
    }
}

impl RemapColumns for Project {
    fn remap_columns(&self, _map: &ColRefMap, _must_exist: bool) -> OptResult<Self> {
        Ok(self.clone())
    }
}

impl DisplayFields for Project {
    fn display(&self, _f: &mut Formatter<'_>) -> std::fmt::Result {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::LogicalOperator::{LogicalGet, LogicalProject};
    use crate::operator::Get;
    use crate::test_utils::{employee_context, employee_table};

    #[test]
    fn test_key_survives_rename() {
        let ctx = employee_context();
        let get = Get::new(&ctx, employee_table(&ctx));
        let cols = get.output_columns().to_vec();
        let get_expr = Expression::build(LogicalGet(get), vec![]);

        let renamed = ctx.column_factory().copy(&cols[0]);
        let list = scalar::project_list(vec![
            scalar::project_element(renamed.clone(), scalar::ident(cols[0].clone())),
            scalar::project_element(cols[1].clone(), scalar::ident(cols[1].clone())),
        ]);
        let project = Expression::new(LogicalProject(Project::new()), vec![get_expr, list]).unwrap();

        let props = project.derive_relational();
        assert_eq!(2, props.output_columns().len());
        assert!(props.output_columns().contains(&renamed));
        assert_eq!(1, props.key_collection().len());
        assert!(props.key_collection().keys()[0].contains(&renamed));
        assert!(props.not_null_columns().contains(&renamed));
    }
}
