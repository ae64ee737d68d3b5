use std::fmt::Formatter;

use strum_macros::AsRefStr;

use crate::column::{remap_column, remap_columns, ColRef, ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::expression::ExpressionHandle;
use crate::metadata::{DistributionPolicy, TableDescriptorRef};
use crate::operator::{
    Arity, DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
    RelationalOperatorTrait, RemapColumns,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{DistributionSpec, MaxCard, PhysicalPropertySet};
use crate::stats::Statistics;

fn remap_optional(
    col: &Option<ColRef>,
    map: &ColRefMap,
    must_exist: bool,
) -> OptResult<Option<ColRef>> {
    col.as_ref()
        .map(|c| remap_column(c, map, must_exist))
        .transpose()
}

/// Inserts the rows of its child into `table`. `source_columns[i]` feeds the `i`-th table column.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Insert {
    table: TableDescriptorRef,
    source_columns: Vec<ColRef>,
}

impl Insert {
    pub fn new(table: TableDescriptorRef, source_columns: Vec<ColRef>) -> Self {
        assert_eq!(
            table.column_count(),
            source_columns.len(),
            "Insert into {} needs one source column per table column",
            table.name()
        );
        Self {
            table,
            source_columns,
        }
    }

    pub fn table(&self) -> &TableDescriptorRef {
        &self.table
    }

    pub fn source_columns(&self) -> &[ColRef] {
        &self.source_columns
    }
}

impl RelationalOperatorTrait for Insert {
    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn derive_output_columns(&self, _handle: &ExpressionHandle) -> ColRefSet {
        self.source_columns.iter().collect()
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

impl RemapColumns for Insert {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(Self {
            table: self.table.clone(),
            source_columns: remap_columns(&self.source_columns, map, must_exist)?,
        })
    }
}

impl DisplayFields for Insert {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("table", &self.table.name())
            .field("source_columns", &self.source_columns)
            .finish()
    }
}

/// Deletes the rows identified by `ctid` and `segment_id` from `table`.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Delete {
    table: TableDescriptorRef,
    columns: Vec<ColRef>,
    ctid: ColRef,
    segment_id: ColRef,
}

impl Delete {
    pub fn new(
        table: TableDescriptorRef,
        columns: Vec<ColRef>,
        ctid: ColRef,
        segment_id: ColRef,
    ) -> Self {
        Self {
            table,
            columns,
            ctid,
            segment_id,
        }
    }

    pub fn table(&self) -> &TableDescriptorRef {
        &self.table
    }

    pub fn columns(&self) -> &[ColRef] {
        &self.columns
    }

    pub fn ctid(&self) -> &ColRef {
        &self.ctid
    }

    pub fn segment_id(&self) -> &ColRef {
        &self.segment_id
    }
}

impl RelationalOperatorTrait for Delete {
    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn derive_output_columns(&self, _handle: &ExpressionHandle) -> ColRefSet {
        self.columns.iter().collect()
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

impl RemapColumns for Delete {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(Self {
            table: self.table.clone(),
            columns: remap_columns(&self.columns, map, must_exist)?,
            ctid: remap_column(&self.ctid, map, must_exist)?,
            segment_id: remap_column(&self.segment_id, map, must_exist)?,
        })
    }
}

impl DisplayFields for Delete {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("table", &self.table.name())
            .field("ctid", &self.ctid)
            .field("segment_id", &self.segment_id)
            .finish()
    }
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, AsRefStr)]
pub enum DmlAction {
    Insert,
    Delete,
}

/// Generic modification of `table`.
///
/// With an action column the action is read per row, as produced by a [`Split`]. Otherwise every
/// row gets `action`.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Dml {
    action: DmlAction,
    table: TableDescriptorRef,
    source_columns: Vec<ColRef>,
    action_col: Option<ColRef>,
    ctid: Option<ColRef>,
    segment_id: Option<ColRef>,
    tuple_oid: Option<ColRef>,
}

impl Dml {
    pub fn new(action: DmlAction, table: TableDescriptorRef, source_columns: Vec<ColRef>) -> Self {
        Self {
            action,
            table,
            source_columns,
            action_col: None,
            ctid: None,
            segment_id: None,
            tuple_oid: None,
        }
    }

    pub fn with_action_col(mut self, col: ColRef) -> Self {
        self.action_col = Some(col);
        self
    }

    pub fn with_row_locator(mut self, ctid: ColRef, segment_id: ColRef) -> Self {
        self.ctid = Some(ctid);
        self.segment_id = Some(segment_id);
        self
    }

    pub fn with_tuple_oid(mut self, col: ColRef) -> Self {
        self.tuple_oid = Some(col);
        self
    }

    pub fn action(&self) -> DmlAction {
        self.action
    }

    pub fn table(&self) -> &TableDescriptorRef {
        &self.table
    }

    pub fn source_columns(&self) -> &[ColRef] {
        &self.source_columns
    }

    pub fn action_col(&self) -> Option<&ColRef> {
        self.action_col.as_ref()
    }

    pub fn ctid(&self) -> Option<&ColRef> {
        self.ctid.as_ref()
    }

    pub fn segment_id(&self) -> Option<&ColRef> {
        self.segment_id.as_ref()
    }

    pub fn tuple_oid(&self) -> Option<&ColRef> {
        self.tuple_oid.as_ref()
    }

    /// Distribution the rows must have to reach the segments holding the target rows.
    fn target_distribution(&self) -> DistributionSpec {
        match self.table.distribution() {
            DistributionPolicy::Hash if !self.table.convert_hash_to_random() => {
                let columns: Vec<ColRef> = self
                    .table
                    .distribution_columns()
                    .iter()
                    .filter_map(|pos| self.source_columns.get(*pos).cloned())
                    .collect();
                if columns.is_empty() {
                    DistributionSpec::Random
                } else {
                    DistributionSpec::Hashed(columns)
                }
            }
            DistributionPolicy::Hash | DistributionPolicy::Random => DistributionSpec::Random,
            DistributionPolicy::Replicated => DistributionSpec::Replicated,
            DistributionPolicy::MasterOnly => DistributionSpec::Singleton,
        }
    }
}

impl RelationalOperatorTrait for Dml {
    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn derive_output_columns(&self, _handle: &ExpressionHandle) -> ColRefSet {
        self.source_columns
            .iter()
            .chain(self.action_col.iter())
            .chain(self.ctid.iter())
            .chain(self.segment_id.iter())
            .chain(self.tuple_oid.iter())
            .collect()
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

impl PhysicalOperatorTrait for Dml {
    fn derive_properties(&self, _context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        let prop = PhysicalPropertySet::default().with_distribution(self.target_distribution());
        Ok(vec![DerivePropResult {
            output_prop: prop.clone(),
            input_required_props: vec![prop],
        }])
    }
}

impl RemapColumns for Dml {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(Self {
            action: self.action,
            table: self.table.clone(),
            source_columns: remap_columns(&self.source_columns, map, must_exist)?,
            action_col: remap_optional(&self.action_col, map, must_exist)?,
            ctid: remap_optional(&self.ctid, map, must_exist)?,
            segment_id: remap_optional(&self.segment_id, map, must_exist)?,
            tuple_oid: remap_optional(&self.tuple_oid, map, must_exist)?,
        })
    }
}

impl DisplayFields for Dml {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("action", &self.action)
            .field("table", &self.table.name())
            .field("action_col", &self.action_col)
            .field("ctid", &self.ctid)
            .field("segment_id", &self.segment_id)
            .finish()
    }
}

/// Turns each update row into a delete row and an insert row, tagged by `action_col`.
///
/// The second child is the project list computing the new values.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Split {
    deletion_columns: Vec<ColRef>,
    insertion_columns: Vec<ColRef>,
    ctid: ColRef,
    segment_id: ColRef,
    action_col: ColRef,
    tuple_oid: Option<ColRef>,
}

impl Split {
    pub fn new(
        deletion_columns: Vec<ColRef>,
        insertion_columns: Vec<ColRef>,
        ctid: ColRef,
        segment_id: ColRef,
        action_col: ColRef,
    ) -> Self {
        assert_eq!(
            deletion_columns.len(),
            insertion_columns.len(),
            "Split needs as many insertion columns as deletion columns"
        );
        Self {
            deletion_columns,
            insertion_columns,
            ctid,
            segment_id,
            action_col,
            tuple_oid: None,
        }
    }

    pub fn with_tuple_oid(mut self, col: ColRef) -> Self {
        self.tuple_oid = Some(col);
        self
    }

    pub fn deletion_columns(&self) -> &[ColRef] {
        &self.deletion_columns
    }

    pub fn insertion_columns(&self) -> &[ColRef] {
        &self.insertion_columns
    }

    pub fn ctid(&self) -> &ColRef {
        &self.ctid
    }

    pub fn segment_id(&self) -> &ColRef {
        &self.segment_id
    }

    pub fn action_col(&self) -> &ColRef {
        &self.action_col
    }

    pub fn tuple_oid(&self) -> Option<&ColRef> {
        self.tuple_oid.as_ref()
    }
}

impl RelationalOperatorTrait for Split {
    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }

    fn scalar_child_count(&self) -> usize {
        1
    }

    fn derive_output_columns(&self, handle: &ExpressionHandle) -> ColRefSet {
        let mut output = handle.derive_output_columns_pass_through(0);
        output.include(self.action_col.clone());
        output
    }

    fn derive_max_card(&self, handle: &ExpressionHandle) -> MaxCard {
        handle.derive_max_card_pass_through(0) * MaxCard::new(2)
    }

    fn derive_stats(
        &self,
        handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        let input = handle.child_stats(0, ctx)?;
        Ok(input.with_rows(input.rows() * 2.0))
    }
}

impl PhysicalOperatorTrait for Split {
    fn derive_properties(&self, context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::pass_through(&context, 1)])
    }
}

impl RemapColumns for Split {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(Self {
            deletion_columns: remap_columns(&self.deletion_columns, map, must_exist)?,
            insertion_columns: remap_columns(&self.insertion_columns, map, must_exist)?,
            ctid: remap_column(&self.ctid, map, must_exist)?,
            segment_id: remap_column(&self.segment_id, map, must_exist)?,
            action_col: remap_column(&self.action_col, map, must_exist)?,
            tuple_oid: remap_optional(&self.tuple_oid, map, must_exist)?,
        })
    }
}

impl DisplayFields for Split {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("action_col", &self.action_col)
            .field("ctid", &self.ctid)
            .field("segment_id", &self.segment_id)
            .finish()
    }
}
