use std::fmt::Formatter;

use crate::column::{create_mapping, remap_columns, ColRef, ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::expression::ExpressionHandle;
use crate::metadata::{
    IndexDescriptor, IndexDescriptorRef, IndexType, TableDescriptor, TableDescriptorRef,
};
use crate::operator::get::{
    table_constraint, table_key_collection, table_not_null_columns, table_scan_properties,
};
use crate::operator::{
    Arity, DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
    RelationalOperatorTrait, RemapColumns,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{
    KeyCollection, MaxCard, OrderSpec, Ordering, PhysicalPropertySet, PropConstraint,
    RewindabilitySpec,
};
use crate::stats::Statistics;

/// Order delivered by scanning `index`: its longest key prefix present in `output`.
pub(crate) fn index_order(
    table: &TableDescriptor,
    index: &IndexDescriptor,
    output: &[ColRef],
) -> OrderSpec {
    if index.index_type() == IndexType::Bitmap {
        return OrderSpec::default();
    }
    let orders = index
        .key_columns()
        .iter()
        .map(|pos| {
            let attno = table.column_at(*pos).attno;
            output.iter().find(|c| c.attno() == Some(attno)).cloned()
        })
        .take_while(Option::is_some)
        .flatten()
        .map(Ordering::asc)
        .collect();
    OrderSpec::new(orders)
}

/// Outer references of a scan whose scalar children read the scan's own output.
pub(crate) fn scan_outer_references(handle: &ExpressionHandle, output: &[ColRef]) -> ColRefSet {
    let mut used = ColRefSet::new();
    for i in 0..handle.arity() {
        used.include_all(handle.child_scalar_props(i).used_columns().iter());
    }
    used.difference(&output.iter().collect())
}

/// Reads a table through an index. The only child is the index condition.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct IndexGet {
    table: TableDescriptorRef,
    index: IndexDescriptorRef,
    output_columns: Vec<ColRef>,
    order: OrderSpec,
}

impl IndexGet {
    pub fn new(ctx: &OptimizerContext, table: TableDescriptorRef, index: IndexDescriptorRef) -> Self {
        let output_columns =
            create_mapping(ctx.column_factory(), table.columns(), ctx.next_operator_id());
        Self::with_columns(table, index, output_columns)
    }

    pub fn with_columns(
        table: TableDescriptorRef,
        index: IndexDescriptorRef,
        output_columns: Vec<ColRef>,
    ) -> Self {
        let order = index_order(&table, &index, &output_columns);
        Self {
            table,
            index,
            output_columns,
            order,
        }
    }

    pub fn table(&self) -> &TableDescriptorRef {
        &self.table
    }

    pub fn index(&self) -> &IndexDescriptorRef {
        &self.index
    }

    pub fn output_columns(&self) -> &[ColRef] {
        &self.output_columns
    }

    pub fn order(&self) -> &OrderSpec {
        &self.order
    }
}

impl RelationalOperatorTrait for IndexGet {
    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn scalar_child_count(&self) -> usize {
        1
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

impl PhysicalOperatorTrait for IndexGet {
    fn derive_properties(&self, _context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        Ok(table_scan_properties(
            &self.table,
            &self.output_columns,
            RewindabilitySpec::Rewindable,
        )
        .into_iter()
        .map(|r| DerivePropResult {
            output_prop: PhysicalPropertySet::new(
                r.output_prop.distribution().clone(),
                self.order.clone(),
                r.output_prop.rewindability(),
            ),
            input_required_props: r.input_required_props,
        })
        .collect())
    }
}

impl RemapColumns for IndexGet {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(Self::with_columns(
            self.table.clone(),
            self.index.clone(),
            remap_columns(&self.output_columns, map, must_exist)?,
        ))
    }
}

impl DisplayFields for IndexGet {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("table", &self.table.name())
            .field("index", &self.index.name())
            .field("columns", &self.output_columns)
            .finish()
    }
}
