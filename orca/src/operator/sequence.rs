use std::fmt::Formatter;

use crate::column::{ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::expression::ExpressionHandle;
use crate::operator::{
    Arity, DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
    RelationalOperatorTrait, RemapColumns,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{KeyCollection, MaxCard, PhysicalPropertySet, PropConstraint};
use crate::stats::Statistics;

/// Evaluates its children in order and returns the rows of the last one.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct Sequence {}

impl Sequence {
    pub fn new() -> Self {
        Self {}
    }
}

fn last(handle: &ExpressionHandle) -> usize {
    handle.arity() - 1
}

impl RelationalOperatorTrait for Sequence {
    fn arity(&self) -> Arity {
        Arity::AtLeast(1)
    }

    fn derive_output_columns(&self, handle: &ExpressionHandle) -> ColRefSet {
        handle.derive_output_columns_pass_through(last(handle))
    }

    fn derive_not_null_columns(&self, handle: &ExpressionHandle, _output: &ColRefSet) -> ColRefSet {
        handle.child_relational(last(handle)).not_null_columns().clone()
    }

    fn derive_key_collection(&self, handle: &ExpressionHandle) -> KeyCollection {
        handle.derive_key_collection_pass_through(last(handle))
    }

    fn derive_constraint(&self, handle: &ExpressionHandle) -> PropConstraint {
        handle.derive_constraint_pass_through(last(handle))
    }

    fn derive_max_card(&self, handle: &ExpressionHandle) -> MaxCard {
        handle.derive_max_card_pass_through(last(handle))
    }

    fn derive_stats(
        &self,
        handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        Ok((*handle.child_stats(last(handle), ctx)?).clone())
    }
}

impl PhysicalOperatorTrait for Sequence {
    /// Only the last child has to deliver what is required.
    fn derive_properties(&self, context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        let mut inputs = vec![PhysicalPropertySet::default(); last(context.expr_handle)];
        inputs.push(context.required_prop.clone());
        Ok(vec![DerivePropResult {
            output_prop: context.required_prop.clone(),
            input_required_props: inputs,
        }])
    }
}

impl RemapColumns for Sequence {
    fn remap_columns(&self, _map: &ColRefMap, _must_exist: bool) -> OptResult<Self> {
        Ok(self.clone())
    }
}

impl DisplayFields for Sequence {
    fn display(&self, _f: &mut Formatter<'_>) -> std::fmt::Result {
        Ok(())
    }
}
