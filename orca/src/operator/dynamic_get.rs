use std::fmt::Formatter;
use std::ops::Bound;

use itertools::Itertools;
use log::debug;

use crate::column::{
    create_mapping, remap_column_arrays, remap_columns, ColRef, ColRefMap, ColRefSet,
};
use crate::error::{OptError, OptResult};
use crate::expression::ExpressionHandle;
use crate::metadata::{IndexDescriptorRef, MdId, RelationMd, TableDescriptorRef};
use crate::operator::get::{
    table_constraint, table_key_collection, table_not_null_columns, table_scan_properties,
};
use crate::operator::index_get::{index_order, scan_outer_references};
use crate::operator::{
    Arity, DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
    RelationalOperatorTrait, RemapColumns,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{
    Constraint, KeyCollection, MaxCard, OrderSpec, PartInfo, PhysicalPropertySet,
    PropConstraint, Range, RewindabilitySpec,
};
use crate::stats::Statistics;

/// Partition selection state of a dynamic scan.
///
/// Moves from `Unbounded` to `Constrained` to `Partial`, never backwards.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum PartScanState {
    /// Reads the whole partitioning space.
    Unbounded,
    Constrained(Constraint),
    /// Reads only the partitions of its constraint, on behalf of the secondary scan id.
    Partial(Constraint),
}

/// State shared by scans over partitioned tables.
///
/// Partitions are kept as a flat list of leaf partition ids. `root_col_mapping[i][j]` is the
/// position in partition `i` of the `j`-th column of the root table.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct DynamicScanBase {
    table: TableDescriptorRef,
    scan_id: u32,
    secondary_scan_id: u32,
    output_columns: Vec<ColRef>,
    part_columns: Vec<Vec<ColRef>>,
    partitions: Vec<MdId>,
    root_col_mapping: Vec<Vec<usize>>,
    state: PartScanState,
}

fn root_col_mapping(relation: &RelationMd, partitions: &[MdId]) -> OptResult<Vec<Vec<usize>>> {
    partitions
        .iter()
        .map(|id| {
            let partition = relation.partition(*id).ok_or_else(|| {
                OptError::InvalidArgument(format!(
                    "Partition {} doesn't belong to {}",
                    id, relation.name
                ))
            })?;
            if partition.column_names.is_empty() {
                return Ok((0..relation.columns.len()).collect());
            }
            relation
                .columns
                .iter()
                .map(|c| {
                    partition
                        .column_names
                        .iter()
                        .position(|name| name == &c.name)
                        .ok_or_else(|| {
                            OptError::Unsupported(format!(
                                "Partition {} has no column named {}",
                                id, c.name
                            ))
                        })
                })
                .try_collect()
        })
        .try_collect()
}

impl DynamicScanBase {
    fn new(
        ctx: &OptimizerContext,
        table: TableDescriptorRef,
        partitions: Vec<MdId>,
    ) -> OptResult<Self> {
        assert!(table.is_partitioned(), "{} is not partitioned", table.name());
        let relation = ctx.md_accessor().retrieve_relation(table.mdid())?;
        let root_col_mapping = root_col_mapping(&relation, &partitions)?;

        let output_columns =
            create_mapping(ctx.column_factory(), table.columns(), ctx.next_operator_id());
        let part_columns = table
            .partition_columns()
            .iter()
            .map(|pos| vec![output_columns[*pos].clone()])
            .collect();
        let scan_id = ctx.next_scan_id();

        Ok(Self {
            table,
            scan_id,
            secondary_scan_id: scan_id,
            output_columns,
            part_columns,
            partitions,
            root_col_mapping,
            state: PartScanState::Unbounded,
        })
    }

    pub fn table(&self) -> &TableDescriptorRef {
        &self.table
    }

    pub fn scan_id(&self) -> u32 {
        self.scan_id
    }

    pub fn secondary_scan_id(&self) -> u32 {
        self.secondary_scan_id
    }

    pub fn output_columns(&self) -> &[ColRef] {
        &self.output_columns
    }

    pub fn part_columns(&self) -> &[Vec<ColRef>] {
        &self.part_columns
    }

    pub fn partitions(&self) -> &[MdId] {
        &self.partitions
    }

    pub fn root_col_mapping(&self) -> &[Vec<usize>] {
        &self.root_col_mapping
    }

    pub fn state(&self) -> &PartScanState {
        &self.state
    }

    pub fn part_constraint(&self) -> Option<&Constraint> {
        match &self.state {
            PartScanState::Unbounded => None,
            PartScanState::Constrained(c) | PartScanState::Partial(c) => Some(c),
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.state, PartScanState::Partial(_))
    }

    /// Restricts the scan to the partitions satisfying `constraint`.
    ///
    /// # Panics
    ///
    /// If a constraint was already set.
    pub fn set_part_constraint(&mut self, constraint: Constraint) {
        assert_eq!(
            PartScanState::Unbounded,
            self.state,
            "Partition constraint of scan {} already set",
            self.scan_id
        );
        self.state = PartScanState::Constrained(constraint);
    }

    pub fn set_secondary_scan_id(&mut self, id: u32) {
        self.secondary_scan_id = id;
    }

    /// Marks the scan as reading a part of the table only.
    ///
    /// The constraint must be a union of at most `max_partial_scan_ranges` ranges on the first
    /// partition column, otherwise the scan is rejected as unsupported and left unchanged.
    ///
    /// # Panics
    ///
    /// If the scan is not constrained, or is already partial.
    pub fn set_partial(&mut self, ctx: &OptimizerContext) -> OptResult<()> {
        let constraint = match &self.state {
            PartScanState::Constrained(c) => c,
            PartScanState::Unbounded => panic!("Scan {} has no partition constraint", self.scan_id),
            PartScanState::Partial(_) => panic!("Scan {} is already partial", self.scan_id),
        };

        let interval = self
            .part_columns
            .first()
            .and_then(|cols| cols.first())
            .and_then(|col| constraint.interval_on(col))
            .ok_or_else(|| {
                OptError::Unsupported(format!(
                    "Partition constraint of scan {} is not on its partition key",
                    self.scan_id
                ))
            })?;
        let max_ranges = ctx.config().max_partial_scan_ranges;
        if interval.range_count() > max_ranges {
            debug!(
                "Partial scan {} needs {} ranges, at most {} supported",
                self.scan_id,
                interval.range_count(),
                max_ranges
            );
            return Err(OptError::Unsupported(format!(
                "Partition constraint of scan {} has too many ranges",
                self.scan_id
            )));
        }

        self.state = PartScanState::Partial(constraint.clone());
        Ok(())
    }

    /// Partitions whose bounds overlap the partition constraint.
    pub fn partitions_matching(&self, relation: &RelationMd) -> Vec<MdId> {
        let interval = self
            .part_columns
            .first()
            .and_then(|cols| cols.first())
            .and_then(|col| self.part_constraint().and_then(|c| c.interval_on(col)));
        let interval = match interval {
            Some(i) => i,
            None => return self.partitions.clone(),
        };

        self.partitions
            .iter()
            .filter(|id| {
                relation
                    .partition(**id)
                    .map(|p| {
                        let range = Range::new(
                            p.lower.clone().map_or(Bound::Unbounded, Bound::Included),
                            p.upper.clone().map_or(Bound::Unbounded, Bound::Excluded),
                        );
                        interval.overlaps(&range)
                    })
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }

    fn output_column_set(&self) -> ColRefSet {
        self.output_columns.iter().collect()
    }

    fn not_null_columns(&self) -> ColRefSet {
        table_not_null_columns(&self.output_columns)
    }

    fn key_collection(&self) -> KeyCollection {
        table_key_collection(&self.table, &self.output_columns)
    }

    fn constraint(&self) -> PropConstraint {
        let table = table_constraint(&self.table, &self.output_columns);
        match self.part_constraint() {
            Some(c) => table.conjoin(&PropConstraint::new(vec![], Some(c.clone()))),
            None => table,
        }
    }

    fn part_info(&self) -> PartInfo {
        let mut part_info = PartInfo::new();
        part_info.add(self.scan_id, self.table.mdid(), self.part_columns.clone());
        part_info
    }

    fn stats(&self, ctx: &OptimizerContext) -> OptResult<Statistics> {
        let stats = ctx
            .stats_estimator()
            .estimate_base_table(&self.table, &self.output_columns)?;
        match &self.state {
            PartScanState::Partial(c) => Ok(ctx
                .stats_estimator()
                .apply_filter(&stats, &c.to_predicate())),
            _ => Ok(stats),
        }
    }
}

impl RemapColumns for DynamicScanBase {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        let state = match &self.state {
            PartScanState::Unbounded => PartScanState::Unbounded,
            PartScanState::Constrained(c) => {
                PartScanState::Constrained(c.remap(map, must_exist)?)
            }
            PartScanState::Partial(c) => PartScanState::Partial(c.remap(map, must_exist)?),
        };
        Ok(Self {
            table: self.table.clone(),
            scan_id: self.scan_id,
            secondary_scan_id: self.secondary_scan_id,
            output_columns: remap_columns(&self.output_columns, map, must_exist)?,
            part_columns: remap_column_arrays(&self.part_columns, map, must_exist)?,
            partitions: self.partitions.clone(),
            root_col_mapping: self.root_col_mapping.clone(),
            state,
        })
    }
}

impl DisplayFields for DynamicScanBase {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("table", &self.table.name())
            .field("scan_id", &self.scan_id)
            .field("columns", &self.output_columns)
            .field("partitions", &self.partitions.len())
            .field("state", &self.state)
            .finish()
    }
}

/// Implements the derivations every dynamic scan shares by delegating to its `base`.
macro_rules! dynamic_scan_derivations {
    () => {
        fn derive_output_columns(&self, _handle: &ExpressionHandle) -> ColRefSet {
            self.base.output_column_set()
        }

        fn derive_not_null_columns(
            &self,
            _handle: &ExpressionHandle,
            _output: &ColRefSet,
        ) -> ColRefSet {
            self.base.not_null_columns()
        }

        fn derive_key_collection(&self, _handle: &ExpressionHandle) -> KeyCollection {
            self.base.key_collection()
        }

        fn derive_part_info(&self, _handle: &ExpressionHandle) -> PartInfo {
            self.base.part_info()
        }

        fn derive_max_card(&self, _handle: &ExpressionHandle) -> MaxCard {
            MaxCard::UNBOUNDED
        }

        fn derive_join_depth(&self, _handle: &ExpressionHandle) -> usize {
            1
        }
    };
}

/// Reads a partitioned table one partition at a time.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct DynamicGet {
    base: DynamicScanBase,
}

impl DynamicGet {
    /// Reads every leaf partition of `table`.
    pub fn new(ctx: &OptimizerContext, table: TableDescriptorRef) -> OptResult<Self> {
        let partitions = table.leaf_partitions().to_vec();
        Self::with_partitions(ctx, table, partitions)
    }

    pub fn with_partitions(
        ctx: &OptimizerContext,
        table: TableDescriptorRef,
        partitions: Vec<MdId>,
    ) -> OptResult<Self> {
        Ok(Self {
            base: DynamicScanBase::new(ctx, table, partitions)?,
        })
    }

    pub fn base(&self) -> &DynamicScanBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut DynamicScanBase {
        &mut self.base
    }
}

impl RelationalOperatorTrait for DynamicGet {
    fn arity(&self) -> Arity {
        Arity::Fixed(0)
    }

    dynamic_scan_derivations!();

    fn derive_constraint(&self, _handle: &ExpressionHandle) -> PropConstraint {
        self.base.constraint()
    }

    fn derive_stats(
        &self,
        _handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        self.base.stats(ctx)
    }
}

impl PhysicalOperatorTrait for DynamicGet {
    fn derive_properties(&self, _context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        Ok(table_scan_properties(
            &self.base.table,
            &self.base.output_columns,
            RewindabilitySpec::Rewindable,
        ))
    }
}

impl RemapColumns for DynamicGet {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(Self {
            base: self.base.remap_columns(map, must_exist)?,
        })
    }
}

impl DisplayFields for DynamicGet {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.base.display(f)
    }
}

/// Index lookup over every partition of a partitioned table. The only child is the index
/// condition.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct DynamicIndexGet {
    base: DynamicScanBase,
    index: IndexDescriptorRef,
    order: OrderSpec,
}

impl DynamicIndexGet {
    pub fn new(
        ctx: &OptimizerContext,
        table: TableDescriptorRef,
        index: IndexDescriptorRef,
    ) -> OptResult<Self> {
        let partitions = table.leaf_partitions().to_vec();
        let base = DynamicScanBase::new(ctx, table, partitions)?;
        let order = index_order(&base.table, &index, &base.output_columns);
        Ok(Self { base, index, order })
    }

    pub fn base(&self) -> &DynamicScanBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut DynamicScanBase {
        &mut self.base
    }

    pub fn index(&self) -> &IndexDescriptorRef {
        &self.index
    }

    pub fn order(&self) -> &OrderSpec {
        &self.order
    }
}

impl RelationalOperatorTrait for DynamicIndexGet {
    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn scalar_child_count(&self) -> usize {
        1
    }

    dynamic_scan_derivations!();

    fn derive_outer_references(&self, handle: &ExpressionHandle) -> ColRefSet {
        scan_outer_references(handle, &self.base.output_columns)
    }

    fn derive_constraint(&self, handle: &ExpressionHandle) -> PropConstraint {
        self.base.constraint().with_predicate(&handle.scalar_child(0))
    }

    fn derive_stats(
        &self,
        handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        let stats = self.base.stats(ctx)?;
        Ok(ctx
            .stats_estimator()
            .apply_filter(&stats, &handle.scalar_child(0)))
    }
}

impl PhysicalOperatorTrait for DynamicIndexGet {
    fn derive_properties(&self, _context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        let mut results = table_scan_properties(
            &self.base.table,
            &self.base.output_columns,
            RewindabilitySpec::Rewindable,
        );
        for result in &mut results {
            result.output_prop = PhysicalPropertySet::new(
                result.output_prop.distribution().clone(),
                self.order.clone(),
                result.output_prop.rewindability(),
            );
        }
        Ok(results)
    }
}

impl RemapColumns for DynamicIndexGet {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        let base = self.base.remap_columns(map, must_exist)?;
        let order = index_order(&base.table, &self.index, &base.output_columns);
        Ok(Self {
            base,
            index: self.index.clone(),
            order,
        })
    }
}

impl DisplayFields for DynamicIndexGet {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.index.name())?;
        self.base.display(f)
    }
}

/// Bitmap scan over every partition of a partitioned table. Children are the recheck condition
/// and the bitmap index path.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct DynamicBitmapTableGet {
    base: DynamicScanBase,
}

impl DynamicBitmapTableGet {
    pub fn new(ctx: &OptimizerContext, table: TableDescriptorRef) -> OptResult<Self> {
        let partitions = table.leaf_partitions().to_vec();
        Ok(Self {
            base: DynamicScanBase::new(ctx, table, partitions)?,
        })
    }

    pub fn base(&self) -> &DynamicScanBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut DynamicScanBase {
        &mut self.base
    }
}

impl RelationalOperatorTrait for DynamicBitmapTableGet {
    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }

    fn scalar_child_count(&self) -> usize {
        2
    }

    dynamic_scan_derivations!();

    fn derive_outer_references(&self, handle: &ExpressionHandle) -> ColRefSet {
        scan_outer_references(handle, &self.base.output_columns)
    }

    fn derive_constraint(&self, handle: &ExpressionHandle) -> PropConstraint {
        self.base.constraint().with_predicate(&handle.scalar_child(0))
    }

    fn derive_stats(
        &self,
        handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        let stats = self.base.stats(ctx)?;
        Ok(ctx
            .stats_estimator()
            .apply_filter(&stats, &handle.scalar_child(0)))
    }
}

impl PhysicalOperatorTrait for DynamicBitmapTableGet {
    fn derive_properties(&self, _context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        Ok(table_scan_properties(
            &self.base.table,
            &self.base.output_columns,
            RewindabilitySpec::Rewindable,
        ))
    }
}

impl RemapColumns for DynamicBitmapTableGet {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(Self {
            base: self.base.remap_columns(map, must_exist)?,
        })
    }
}

impl DisplayFields for DynamicBitmapTableGet {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.base.display(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::identity_map;
    use crate::properties::Interval;
    use crate::test_utils::{employee_context, sales_table};
    use datafusion_common::ScalarValue;
    use datafusion_expr::Operator as CmpOp;

    fn part_key_constraint(get: &DynamicGet, op: CmpOp, value: i32) -> Constraint {
        let col = get.base().part_columns()[0][0].clone();
        Constraint::Interval(
            Interval::from_cmp(col, op, ScalarValue::Int32(Some(value))).unwrap(),
        )
    }

    #[test]
    fn test_state_machine() {
        let ctx = employee_context();
        let mut get = DynamicGet::new(&ctx, sales_table(&ctx)).unwrap();
        assert_eq!(&PartScanState::Unbounded, get.base().state());
        assert_eq!(4, get.base().partitions().len());

        let constraint = part_key_constraint(&get, CmpOp::Lt, 200);
        get.base_mut().set_part_constraint(constraint.clone());
        assert_eq!(Some(&constraint), get.base().part_constraint());
        assert!(!get.base().is_partial());

        get.base_mut().set_secondary_scan_id(42);
        get.base_mut().set_partial(&ctx).unwrap();
        assert!(get.base().is_partial());
        assert_eq!(42, get.base().secondary_scan_id());
    }

    #[test]
    #[should_panic(expected = "already partial")]
    fn test_set_partial_twice() {
        let ctx = employee_context();
        let mut get = DynamicGet::new(&ctx, sales_table(&ctx)).unwrap();
        let constraint = part_key_constraint(&get, CmpOp::Lt, 200);
        get.base_mut().set_part_constraint(constraint);
        get.base_mut().set_partial(&ctx).unwrap();
        let _ = get.base_mut().set_partial(&ctx);
    }

    #[test]
    #[should_panic(expected = "already set")]
    fn test_set_constraint_after_partial() {
        let ctx = employee_context();
        let mut get = DynamicGet::new(&ctx, sales_table(&ctx)).unwrap();
        let constraint = part_key_constraint(&get, CmpOp::Lt, 200);
        get.base_mut().set_part_constraint(constraint.clone());
        get.base_mut().set_partial(&ctx).unwrap();
        get.base_mut().set_part_constraint(constraint);
    }

    #[test]
    fn test_partial_rejects_too_many_ranges() {
        let ctx = employee_context();
        let mut get = DynamicGet::new(&ctx, sales_table(&ctx)).unwrap();
        let col = get.base().part_columns()[0][0].clone();
        let points = (0..ctx.config().max_partial_scan_ranges as i32 + 1)
            .map(|v| {
                Constraint::Interval(Interval::new(
                    col.clone(),
                    vec![Range::point(ScalarValue::Int32(Some(v * 10)))],
                    false,
                ))
            })
            .collect();
        get.base_mut()
            .set_part_constraint(Constraint::disjunction(points).unwrap());

        let err = get.base_mut().set_partial(&ctx).unwrap_err();
        assert!(err.is_unsupported());
        assert!(!get.base().is_partial());
    }

    #[test]
    fn test_partitions_matching() {
        let ctx = employee_context();
        let table = sales_table(&ctx);
        let relation = ctx.md_accessor().retrieve_relation(table.mdid()).unwrap();
        let mut get = DynamicGet::new(&ctx, table).unwrap();
        assert_eq!(4, get.base().partitions_matching(&relation).len());

        let constraint = part_key_constraint(&get, CmpOp::Lt, 200);
        get.base_mut().set_part_constraint(constraint);
        assert_eq!(2, get.base().partitions_matching(&relation).len());
    }

    #[test]
    fn test_remap_keeps_state() {
        let ctx = employee_context();
        let mut get = DynamicGet::new(&ctx, sales_table(&ctx)).unwrap();
        let constraint = part_key_constraint(&get, CmpOp::GtEq, 100);
        get.base_mut().set_part_constraint(constraint);

        let map = identity_map(get.base().output_columns());
        let copy = get.remap_columns(&map, true).unwrap();
        assert_eq!(get, copy);
    }
}
