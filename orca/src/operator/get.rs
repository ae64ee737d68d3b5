use std::collections::HashMap;
use std::fmt::Formatter;

use crate::column::{create_mapping, remap_columns, ColRef, ColRefMap, ColRefSet};
use crate::error::{OptError, OptResult};
use crate::expression::ExpressionHandle;
use crate::metadata::{StorageType, TableDescriptor, TableDescriptorRef};
use crate::operator::{
    Arity, DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
    RelationalOperatorTrait, RemapColumns,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{
    Constraint, DistributionSpec, Interval, KeyCollection, MaxCard, PhysicalPropertySet,
    PropConstraint, RewindabilitySpec,
};
use crate::stats::Statistics;

/// Maps the table's key sets onto `output`. A key with a column missing from `output` is dropped.
pub(crate) fn table_key_collection(table: &TableDescriptor, output: &[ColRef]) -> KeyCollection {
    let by_attno: HashMap<i32, &ColRef> = output
        .iter()
        .filter_map(|c| c.attno().map(|attno| (attno, c)))
        .collect();

    table
        .key_sets()
        .iter()
        .filter_map(|key| {
            key.iter()
                .map(|pos| by_attno.get(&table.column_at(*pos).attno).map(|c| (*c).clone()))
                .collect::<Option<ColRefSet>>()
        })
        .collect()
}

/// Not null intervals of the non nullable user columns in `output`.
pub(crate) fn table_constraint(table: &TableDescriptor, output: &[ColRef]) -> PropConstraint {
    let intervals = output
        .iter()
        .filter(|c| !c.is_nullable())
        .filter(|c| {
            c.attno()
                .and_then(|attno| table.position_of_attno(attno))
                .map(|pos| !table.column_at(pos).is_system)
                .unwrap_or(false)
        })
        .map(|c| Constraint::Interval(Interval::not_null(c.clone())))
        .collect();
    PropConstraint::new(vec![], Constraint::conjunction(intervals))
}

pub(crate) fn table_not_null_columns(output: &[ColRef]) -> ColRefSet {
    output.iter().filter(|c| !c.is_nullable()).collect()
}

pub(crate) fn table_scan_properties(
    table: &TableDescriptor,
    output: &[ColRef],
    rewindability: RewindabilitySpec,
) -> Vec<DerivePropResult> {
    vec![DerivePropResult {
        output_prop: PhysicalPropertySet::new(
            DistributionSpec::of_table(table, output),
            Default::default(),
            rewindability,
        ),
        input_required_props: vec![],
    }]
}

/// Reads a table.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Get {
    table: TableDescriptorRef,
    output_columns: Vec<ColRef>,
}

impl Get {
    /// Reads every column of `table` through freshly created columns.
    pub fn new(ctx: &OptimizerContext, table: TableDescriptorRef) -> Self {
        let output_columns =
            create_mapping(ctx.column_factory(), table.columns(), ctx.next_operator_id());
        Self {
            table,
            output_columns,
        }
    }

    /// Reads `output_columns`, which must all be table bound columns of `table`.
    pub fn with_columns(table: TableDescriptorRef, output_columns: Vec<ColRef>) -> Self {
        for col in &output_columns {
            assert!(
                col.attno()
                    .and_then(|attno| table.position_of_attno(attno))
                    .is_some(),
                "Column {:?} doesn't belong to {}",
                col,
                table.name()
            );
        }
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

impl RelationalOperatorTrait for Get {
    fn arity(&self) -> Arity {
        Arity::Fixed(0)
    }

    fn derive_output_columns(&self, _handle: &ExpressionHandle) -> ColRefSet {
        self.output_columns.iter().collect()
    }

    fn derive_not_null_columns(&self, _handle: &ExpressionHandle, _output: &ColRefSet) -> ColRefSet {
        table_not_null_columns(&self.output_columns)
    }

    fn derive_key_collection(&self, _handle: &ExpressionHandle) -> KeyCollection {
        table_key_collection(&self.table, &self.output_columns)
    }

    fn derive_constraint(&self, _handle: &ExpressionHandle) -> PropConstraint {
        table_constraint(&self.table, &self.output_columns)
    }

    fn derive_max_card(&self, _handle: &ExpressionHandle) -> MaxCard {
        MaxCard::UNBOUNDED
    }

    fn derive_join_depth(&self, _handle: &ExpressionHandle) -> usize {
        1
    }

    fn derive_stats(
        &self,
        _handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        ctx.stats_estimator()
            .estimate_base_table(&self.table, &self.output_columns)
    }
}

impl PhysicalOperatorTrait for Get {
    fn derive_properties(&self, _context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        Ok(table_scan_properties(
            &self.table,
            &self.output_columns,
            RewindabilitySpec::Rewindable,
        ))
    }
}

impl RemapColumns for Get {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(Self {
            table: self.table.clone(),
            output_columns: remap_columns(&self.output_columns, map, must_exist)?,
        })
    }
}

impl DisplayFields for Get {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("table", &self.table.name())
            .field("columns", &self.output_columns)
            .finish()
    }
}

/// Reads an external table.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct ExternalGet {
    get: Get,
}

impl ExternalGet {
    pub fn new(ctx: &OptimizerContext, table: TableDescriptorRef) -> OptResult<Self> {
        if table.storage_type() != StorageType::External {
            return Err(OptError::InvalidArgument(format!(
                "{} is not an external table",
                table.name()
            )));
        }
        Ok(Self {
            get: Get::new(ctx, table),
        })
    }

    pub fn table(&self) -> &TableDescriptorRef {
        self.get.table()
    }

    pub fn output_columns(&self) -> &[ColRef] {
        self.get.output_columns()
    }
}

impl RelationalOperatorTrait for ExternalGet {
    fn arity(&self) -> Arity {
        Arity::Fixed(0)
    }

    fn derive_output_columns(&self, handle: &ExpressionHandle) -> ColRefSet {
        self.get.derive_output_columns(handle)
    }

    fn derive_not_null_columns(&self, handle: &ExpressionHandle, output: &ColRefSet) -> ColRefSet {
        self.get.derive_not_null_columns(handle, output)
    }

    fn derive_key_collection(&self, handle: &ExpressionHandle) -> KeyCollection {
        self.get.derive_key_collection(handle)
    }

    fn derive_constraint(&self, handle: &ExpressionHandle) -> PropConstraint {
        self.get.derive_constraint(handle)
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
        self.get.derive_stats(handle, ctx)
    }
}

impl PhysicalOperatorTrait for ExternalGet {
    /// External data is spread over segments in no particular way and can't be rewound.
    fn derive_properties(&self, _context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult {
            output_prop: PhysicalPropertySet::new(
                DistributionSpec::Random,
                Default::default(),
                RewindabilitySpec::NotRewindable,
            ),
            input_required_props: vec![],
        }])
    }
}

impl RemapColumns for ExternalGet {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(Self {
            get: self.get.remap_columns(map, must_exist)?,
        })
    }
}

impl DisplayFields for ExternalGet {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.get.display(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{access_log_table, employee_context, employee_table};

    #[test]
    fn test_external_get_requires_external_table() {
        let ctx = employee_context();
        let err = ExternalGet::new(&ctx, employee_table(&ctx)).unwrap_err();
        assert!(matches!(err, OptError::InvalidArgument(_)));

        let get = ExternalGet::new(&ctx, access_log_table(&ctx)).unwrap();
        assert_eq!(2, get.output_columns().len());
        assert_eq!(StorageType::External, get.table().storage_type());
    }
}
