use std::fmt::Formatter;

use crate::column::{ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::expression::ExpressionHandle;
use crate::operator::scalar;
use crate::operator::{
    Arity, DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
    RelationalOperatorTrait, RemapColumns,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{KeyCollection, MaxCard, PropConstraint};
use crate::stats::Statistics;
use datafusion_common::ScalarValue;

/// Keeps the rows of its first child satisfying the predicate in its second child.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct Select {}

impl Select {
    pub fn new() -> Self {
        Self {}
    }
}

impl RelationalOperatorTrait for Select {
    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }

    fn scalar_child_count(&self) -> usize {
        1
    }

    fn derive_output_columns(&self, handle: &ExpressionHandle) -> ColRefSet {
        handle.derive_output_columns_pass_through(0)
    }

    fn derive_key_collection(&self, handle: &ExpressionHandle) -> KeyCollection {
        handle.derive_key_collection_pass_through(0)
    }

    fn derive_constraint(&self, handle: &ExpressionHandle) -> PropConstraint {
        handle
            .derive_constraint_pass_through(0)
            .with_predicate(&handle.scalar_child(1))
    }

    fn derive_max_card(&self, handle: &ExpressionHandle) -> MaxCard {
        let predicate = handle.scalar_child(1);
        if scalar::constant_of(&predicate) == Some(&ScalarValue::Boolean(Some(false))) {
            return MaxCard::ZERO;
        }
        handle.derive_max_card_pass_through(0)
    }

    fn derive_stats(
        &self,
        handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        let input = handle.child_stats(0, ctx)?;
        Ok(ctx
            .stats_estimator()
            .apply_filter(&input, &handle.scalar_child(1)))
    }
}

impl PhysicalOperatorTrait for Select {
    fn derive_properties(&self, context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::pass_through(&context, 1)])
    }
}

impl RemapColumns for Select {
    fn remap_columns(&self, _map: &ColRefMap, _must_exist: bool) -> OptResult<Self> {
        Ok(self.clone())
    }
}

impl DisplayFields for Select {
    fn display(&self, _f: &mut Formatter<'_>) -> std::fmt::Result {
        Ok(())
    }
}
