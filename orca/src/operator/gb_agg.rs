use std::fmt::Formatter;

use crate::column::{remap_columns, ColRef, ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::expression::ExpressionHandle;
use crate::operator::{
    Arity, DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
    RelationalOperatorTrait, RemapColumns,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{
    DistributionSpec, KeyCollection, MaxCard, PhysicalPropertySet, PropConstraint,
};
use crate::stats::Statistics;

/// Groups its first child on the grouping columns and computes the aggregates of the project
/// list in its second child.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct GbAgg {
    grouping_columns: Vec<ColRef>,
}

impl GbAgg {
    pub fn new(grouping_columns: Vec<ColRef>) -> Self {
        Self { grouping_columns }
    }

    pub fn grouping_columns(&self) -> &[ColRef] {
        &self.grouping_columns
    }

    fn grouping_set(&self) -> ColRefSet {
        self.grouping_columns.iter().collect()
    }
}

impl RelationalOperatorTrait for GbAgg {
    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }

    fn scalar_child_count(&self) -> usize {
        1
    }

    fn derive_output_columns(&self, handle: &ExpressionHandle) -> ColRefSet {
        self.grouping_set()
            .union(handle.child_scalar_props(1).defined_columns())
    }

    fn derive_not_null_columns(&self, handle: &ExpressionHandle, _output: &ColRefSet) -> ColRefSet {
        handle
            .child_relational(0)
            .not_null_columns()
            .intersection(&self.grouping_set())
    }

    fn derive_key_collection(&self, handle: &ExpressionHandle) -> KeyCollection {
        let grouping = self.grouping_set();
        let mut keys = handle
            .child_relational(0)
            .key_collection()
            .project(&grouping);
        keys.add(grouping);
        keys
    }

    fn derive_constraint(&self, handle: &ExpressionHandle) -> PropConstraint {
        handle
            .derive_constraint_pass_through(0)
            .restrict(&self.grouping_set())
    }

    fn derive_max_card(&self, handle: &ExpressionHandle) -> MaxCard {
        if self.grouping_columns.is_empty() {
            MaxCard::ONE
        } else {
            handle.derive_max_card_pass_through(0)
        }
    }

    fn derive_stats(
        &self,
        handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        let input = handle.child_stats(0, ctx)?;
        Ok(ctx
            .stats_estimator()
            .apply_group_by(&input, &self.grouping_set()))
    }
}

impl PhysicalOperatorTrait for GbAgg {
    /// Rows of a group must meet on one segment.
    fn derive_properties(&self, _context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        let distribution = if self.grouping_columns.is_empty() {
            DistributionSpec::Singleton
        } else {
            DistributionSpec::Hashed(self.grouping_columns.clone())
        };
        let prop = PhysicalPropertySet::default().with_distribution(distribution);
        Ok(vec![DerivePropResult {
            output_prop: prop.clone(),
            input_required_props: vec![prop],
        }])
    }
}

impl RemapColumns for GbAgg {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(Self {
            grouping_columns: remap_columns(&self.grouping_columns, map, must_exist)?,
        })
    }
}

impl DisplayFields for GbAgg {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("grouping_columns", &self.grouping_columns)
            .finish()
    }
}
