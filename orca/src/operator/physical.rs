use std::fmt::{Debug, Display, Formatter};

use enum_as_inner::EnumAsInner;
use enum_dispatch::enum_dispatch;
use strum_macros::{AsRefStr, EnumDiscriminants};

use crate::column::ColRefMap;
use crate::error::OptResult;
use crate::expression::ExpressionHandle;
use crate::operator::PhysicalOperator::*;
use crate::operator::{
    BitmapTableGet, DisplayFields, Dml, DynamicBitmapTableGet, DynamicGet, DynamicIndexGet,
    ExternalGet, GbAgg, Get, IndexGet, Join, Limit, Project, RemapColumns, Select, Sequence,
    Split,
};
use crate::properties::PhysicalPropertySet;

/// Physical relational operator.
#[enum_dispatch]
#[derive(Clone, Debug, Hash, Eq, PartialEq, EnumAsInner, AsRefStr, EnumDiscriminants)]
#[strum_discriminants(name(PhysicalOperatorId), derive(Hash, AsRefStr))]
pub enum PhysicalOperator {
    PhysicalTableScan(Get),
    PhysicalDynamicTableScan(DynamicGet),
    PhysicalExternalScan(ExternalGet),
    PhysicalIndexScan(IndexGet),
    PhysicalDynamicIndexScan(DynamicIndexGet),
    PhysicalBitmapTableScan(BitmapTableGet),
    PhysicalDynamicBitmapTableScan(DynamicBitmapTableGet),
    PhysicalFilter(Select),
    PhysicalComputeScalar(Project),
    PhysicalHashJoin(Join),
    PhysicalHashAgg(GbAgg),
    PhysicalLimit(Limit),
    PhysicalSequence(Sequence),
    PhysicalDml(Dml),
    PhysicalSplit(Split),
}

pub struct DerivePropContext<'a> {
    pub required_prop: &'a PhysicalPropertySet,
    pub expr_handle: &'a ExpressionHandle<'a>,
}

#[derive(Debug)]
pub struct DerivePropResult {
    pub output_prop: PhysicalPropertySet,
    pub input_required_props: Vec<PhysicalPropertySet>,
}

impl DerivePropResult {
    /// Delivers whatever is required by asking the same from every relational input.
    pub(crate) fn pass_through(context: &DerivePropContext, inputs: usize) -> Self {
        Self {
            output_prop: context.required_prop.clone(),
            input_required_props: vec![context.required_prop.clone(); inputs],
        }
    }
}

#[enum_dispatch(PhysicalOperator)]
pub trait PhysicalOperatorTrait: Debug + PartialEq {
    /// Derive children's required properties with required properties of current node.
    ///
    /// Each result is one way of implementing the operator. Only relational inputs get a
    /// required property set.
    fn derive_properties(&self, context: DerivePropContext) -> OptResult<Vec<DerivePropResult>>;
}

impl RemapColumns for PhysicalOperator {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(match self {
            PhysicalTableScan(op) => PhysicalTableScan(op.remap_columns(map, must_exist)?),
            PhysicalDynamicTableScan(op) => {
                PhysicalDynamicTableScan(op.remap_columns(map, must_exist)?)
            }
            PhysicalExternalScan(op) => PhysicalExternalScan(op.remap_columns(map, must_exist)?),
            PhysicalIndexScan(op) => PhysicalIndexScan(op.remap_columns(map, must_exist)?),
            PhysicalDynamicIndexScan(op) => {
                PhysicalDynamicIndexScan(op.remap_columns(map, must_exist)?)
            }
            PhysicalBitmapTableScan(op) => {
                PhysicalBitmapTableScan(op.remap_columns(map, must_exist)?)
            }
            PhysicalDynamicBitmapTableScan(op) => {
                PhysicalDynamicBitmapTableScan(op.remap_columns(map, must_exist)?)
            }
            PhysicalFilter(op) => PhysicalFilter(op.remap_columns(map, must_exist)?),
            PhysicalComputeScalar(op) => PhysicalComputeScalar(op.remap_columns(map, must_exist)?),
            PhysicalHashJoin(op) => PhysicalHashJoin(op.remap_columns(map, must_exist)?),
            PhysicalHashAgg(op) => PhysicalHashAgg(op.remap_columns(map, must_exist)?),
            PhysicalLimit(op) => PhysicalLimit(op.remap_columns(map, must_exist)?),
            PhysicalSequence(op) => PhysicalSequence(op.remap_columns(map, must_exist)?),
            PhysicalDml(op) => PhysicalDml(op.remap_columns(map, must_exist)?),
            PhysicalSplit(op) => PhysicalSplit(op.remap_columns(map, must_exist)?),
        })
    }
}

impl Display for PhysicalOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())?;
        self.display(f)
    }
}
