use std::fmt::Formatter;

use crate::column::{create_mapping, remap_columns, ColRef, ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::expression::ExpressionHandle;
use crate::metadata::TableDescriptorRef;
use crate::operator::get::{
    table_constraint, table_key_collection, table_not_null_columns, table_scan_properties,
};
use crate::operator::index_get::scan_outer_references;
use crate::operator::{
    Arity, DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
    RelationalOperatorTrait, RemapColumns,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{KeyCollection, MaxCard, PropConstraint, RewindabilitySpec};
use crate::stats::Statistics;

/// Reads the rows of a table located by a bitmap index path.
///
/// Children are the recheck condition and the bitmap path, usually a
/// [`BitmapIndexProbe`](crate::operator::BitmapIndexProbe).
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct BitmapTableGet {
    table: TableDescriptorRef,
    output_columns: Vec<ColRef>,
}

impl BitmapTableGet {
    pub fn new(ctx: &OptimizerContext, table: TableDescriptorRef) -> Self {
        let output_columns =
            create_mapping(ctx.column_factory(), table.columns(), ctx.next_operator_id());
        Self {
            table,
            output_columns,
        }
    }

    pub fn table(&self) -> &TableDescriptorRef {
        &self.table
    }

    pub fn output_columns(&self) -> &[ColRef] {
        &self.output_columns
    }
}

impl RelationalOperatorTrait for BitmapTableGet {
    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }

    fn scalar_child_count(&self) -> usize {
        2
    }

    fn derive_output_columns(&self, _handle: &ExpressionHandle) -> ColRefSet {
        self.output_columns.iter().collect()
    }

    fn derive_not_null_columns(&self, _handle: &ExpressionHandle, _output: &ColRefSet) -> ColRefSet {
        table_not_null_columns(&self.output_columns)
    }

    fn derive_outer_references(&self, handle: &ExpressionHandle) -> ColRefSet {
        scan_outer_references(handle, &self.output_columns)
    }

    fn derive_key_collection(&self, _handle: &ExpressionHandle) -> KeyCollection {
        table_key_collection(&self.table, &self.output_columns)
    }

    fn derive_constraint(&self, handle: &ExpressionHandle) -> PropConstraint {
        table_constraint(&self.table, &self.output_columns).with_predicate(&handle.scalar_child(0))
    }

    fn derive_max_card(&self, _handle: &ExpressionHandle) -> MaxCard {
        MaxCard::UNBOUNDED
    }

    fn derive_join_depth(&self, _handle: &ExpressionHandle) -> usize {
        1
    }

    fn derive_stats(
        &self,
        handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        let stats = ctx
            .stats_estimator()
            .estimate_base_table(&self.table, &self.output_columns)?;
        Ok(ctx
            .stats_estimator()
            .apply_filter(&stats, &handle.scalar_child(0)))
    }
}

impl PhysicalOperatorTrait for BitmapTableGet {
    fn derive_properties(&self, _context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        Ok(table_scan_properties(
            &self.table,
            &self.output_columns,
            RewindabilitySpec::Rewindable,
        ))
    }
}

impl RemapColumns for BitmapTableGet {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(Self {
            table: self.table.clone(),
            output_columns: remap_columns(&self.output_columns, map, must_exist)?,
        })
    }
}

impl DisplayFields for BitmapTableGet {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("table", &self.table.name())
            .field("columns", &self.output_columns)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use crate::operator::scalar;
    use crate::operator::LogicalOperator::LogicalBitmapTableGet;
    use crate::test_utils::{dept_table, employee_context, employee_dept_index, employee_table};
    use datafusion_common::ScalarValue;
    use datafusion_expr::Operator as CmpOp;

    #[test]
    fn test_outer_references_exclude_own_columns() {
        let ctx = employee_context();
        let get = BitmapTableGet::new(&ctx, employee_table(&ctx));
        let dept = get.output_columns()[2].clone();
        let outer = create_mapping(ctx.column_factory(), dept_table(&ctx).columns(), 0)[0].clone();

        let recheck = scalar::column_eq(dept.clone(), outer.clone());
        let probe = scalar::bitmap_index_probe(
            employee_dept_index(&ctx),
            scalar::cmp(
                CmpOp::Lt,
                scalar::ident(dept),
                scalar::constant(ScalarValue::Int32(Some(5))),
            ),
        );
        let expr = Expression::build(LogicalBitmapTableGet(get.clone()), vec![recheck, probe]);

        let props = expr.derive_relational();
        assert_eq!(1, props.outer_references().len());
        assert!(props.outer_references().contains(&outer));
        assert!(get
            .output_columns()
            .iter()
            .all(|c| !props.outer_references().contains(c)));
        assert_eq!(3, props.output_columns().len());
    }
}
