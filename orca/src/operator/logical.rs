use std::fmt::{Display, Formatter};

use enum_as_inner::EnumAsInner;
use enum_dispatch::enum_dispatch;
use strum_macros::{AsRefStr, EnumDiscriminants};

use crate::column::ColRefMap;
use crate::error::OptResult;
use crate::operator::LogicalOperator::*;
use crate::operator::{
    BitmapTableGet, Delete, DisplayFields, Dml, DynamicBitmapTableGet, DynamicGet,
    DynamicIndexGet, ExternalGet, GbAgg, Get, IndexGet, Insert, Join, Limit, Project,
    RemapColumns, Select, Sequence, Split,
};

/// Logical relational operator.
#[enum_dispatch]
#[derive(Clone, Debug, Hash, Eq, PartialEq, EnumAsInner, AsRefStr, EnumDiscriminants)]
#[strum_discriminants(name(LogicalOperatorId), derive(Hash, AsRefStr))]
pub enum LogicalOperator {
    LogicalGet(Get),
    LogicalDynamicGet(DynamicGet),
    LogicalExternalGet(ExternalGet),
    LogicalIndexGet(IndexGet),
    LogicalDynamicIndexGet(DynamicIndexGet),
    LogicalBitmapTableGet(BitmapTableGet),
    LogicalDynamicBitmapTableGet(DynamicBitmapTableGet),
    LogicalSelect(Select),
    LogicalProject(Project),
    LogicalJoin(Join),
    LogicalGbAgg(GbAgg),
    LogicalLimit(Limit),
    LogicalSequence(Sequence),
    LogicalInsert(Insert),
    LogicalDelete(Delete),
    LogicalDml(Dml),
    LogicalSplit(Split),
}

impl RemapColumns for LogicalOperator {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(match self {
            LogicalGet(op) => LogicalGet(op.remap_columns(map, must_exist)?),
            LogicalDynamicGet(op) => LogicalDynamicGet(op.remap_columns(map, must_exist)?),
            LogicalExternalGet(op) => LogicalExternalGet(op.remap_columns(map, must_exist)?),
            LogicalIndexGet(op) => LogicalIndexGet(op.remap_columns(map, must_exist)?),
            LogicalDynamicIndexGet(op) => {
                LogicalDynamicIndexGet(op.remap_columns(map, must_exist)?)
            }
            LogicalBitmapTableGet(op) => LogicalBitmapTableGet(op.remap_columns(map, must_exist)?),
            LogicalDynamicBitmapTableGet(op) => {
                LogicalDynamicBitmapTableGet(op.remap_columns(map, must_exist)?)
            }
            LogicalSelect(op) => LogicalSelect(op.remap_columns(map, must_exist)?),
            LogicalProject(op) => LogicalProject(op.remap_columns(map, must_exist)?),
            LogicalJoin(op) => LogicalJoin(op.remap_columns(map, must_exist)?),
            LogicalGbAgg(op) => LogicalGbAgg(op.remap_columns(map, must_exist)?),
            LogicalLimit(op) => LogicalLimit(op.remap_columns(map, must_exist)?),
            LogicalSequence(op) => LogicalSequence(op.remap_columns(map, must_exist)?),
            LogicalInsert(op) => LogicalInsert(op.remap_columns(map, must_exist)?),
            LogicalDelete(op) => LogicalDelete(op.remap_columns(map, must_exist)?),
            LogicalDml(op) => LogicalDml(op.remap_columns(map, must_exist)?),
            LogicalSplit(op) => LogicalSplit(op.remap_columns(map, must_exist)?),
        })
    }
}

impl Display for LogicalOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())?;
        self.display(f)
    }
}
