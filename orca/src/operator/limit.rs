use std::fmt::Formatter;

use crate::column::{remap_column, ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::expression::ExpressionHandle;
use crate::operator::{
    Arity, DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
    RelationalOperatorTrait, RemapColumns,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{
    DistributionSpec, KeyCollection, MaxCard, OrderSpec, Ordering, PhysicalPropertySet,
    PropConstraint,
};
use crate::stats::Statistics;

/// Returns at most `count` rows of its child after skipping `offset` rows in `order`.
///
/// A global limit applies to the whole input, a local one to the rows of each segment.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Limit {
    order: OrderSpec,
    offset: u64,
    count: Option<u64>,
    global: bool,
}

impl Limit {
    pub fn new(order: OrderSpec, offset: u64, count: Option<u64>, global: bool) -> Self {
        Self {
            order,
            offset,
            count,
            global,
        }
    }

    pub fn order(&self) -> &OrderSpec {
        &self.order
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn is_global(&self) -> bool {
        self.global
    }
}

impl RelationalOperatorTrait for Limit {
    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn derive_output_columns(&self, handle: &ExpressionHandle) -> ColRefSet {
        handle.derive_output_columns_pass_through(0)
    }

    fn derive_key_collection(&self, handle: &ExpressionHandle) -> KeyCollection {
        handle.derive_key_collection_pass_through(0)
    }

    fn derive_constraint(&self, handle: &ExpressionHandle) -> PropConstraint {
        handle.derive_constraint_pass_through(0)
    }

    fn derive_max_card(&self, handle: &ExpressionHandle) -> MaxCard {
        let input = handle.derive_max_card_pass_through(0);
        match self.count {
            Some(count) if count < input.value() => MaxCard::new(count),
            _ => input,
        }
    }

    fn derive_stats(
        &self,
        handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        let input = handle.child_stats(0, ctx)?;
        Ok(match self.count {
            Some(count) => ctx.stats_estimator().apply_limit(&input, count),
            None => (*input).clone(),
        })
    }
}

impl PhysicalOperatorTrait for Limit {
    fn derive_properties(&self, context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        let distribution = if self.global {
            DistributionSpec::Singleton
        } else {
            context.required_prop.distribution().clone()
        };
        let prop = PhysicalPropertySet::new(
            distribution,
            self.order.clone(),
            context.required_prop.rewindability(),
        );
        Ok(vec![DerivePropResult {
            output_prop: prop.clone(),
            input_required_props: vec![prop],
        }])
    }
}

impl RemapColumns for Limit {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        let orders = self
            .order
            .orders()
            .iter()
            .map(|o| {
                Ok(Ordering::new(
                    remap_column(o.column(), map, must_exist)?,
                    o.is_asc(),
                    o.is_null_first(),
                ))
            })
            .collect::<OptResult<Vec<_>>>()?;
        Ok(Self {
            order: OrderSpec::new(orders),
            ..self.clone()
        })
    }
}

impl DisplayFields for Limit {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("offset", &self.offset)
            .field("count", &self.count)
            .field("global", &self.global)
            .finish()
    }
}
