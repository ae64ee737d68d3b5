//! Transformation rules (xforms).
//!
//! An xform defines an equivalent transformation of an expression. There are two kinds:
//!
//! 1. Exploration xforms produce logically equivalent alternatives, e.g. [`JoinCommutativity`]
//! which swaps the inputs of an inner join.
//! 2. Implementation xforms turn a logical operator into a physical one, e.g. [`Get2TableScan`].
//!
//! ## Pattern
//!
//! A pattern defines what expression the xform operates on. The driver binds the pattern
//! against the memo and hands the xform an [`Expression`] whose unexplored relational inputs
//! are group bound leaves, so xforms never see the memo:
//!
//!```no
//! [Group 0: LogicalJoin]                                 [LogicalJoin]
//!     /      |       \            JoinCommutativity       /    |    \
//! [Group 1] [Group 2] [a = b]        -------->     [Group 2] [Group 1] [a = b]
//! ```
//!
//! The driver asks [`Xform::promise`] first and never transforms a binding whose promise is
//! [`XformPromise::None`].
mod pattern;
pub use pattern::*;
mod join;
pub use join::*;
mod semi_join;
pub use semi_join::*;
mod implementation;
pub use implementation::*;
mod dml;
pub use dml::*;
mod prune;
pub use prune::*;

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use enum_dispatch::enum_dispatch;
use enumset::{EnumSet, EnumSetType};
use strum_macros::AsRefStr;

use crate::error::OptResult;
use crate::expression::{Expression, ExpressionHandle};
use crate::optimizer::OptimizerContext;

/// Alternatives produced by one transform call.
#[derive(Default, Debug)]
pub struct XformResult {
    exprs: Vec<Arc<Expression>>,
}

impl XformResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, new_expr: Arc<Expression>) {
        self.exprs.push(new_expr);
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn results(self) -> impl Iterator<Item = Arc<Expression>> {
        self.exprs.into_iter()
    }
}

/// Priority of applying an xform to an expression. `None` means never applicable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum XformPromise {
    None,
    Low,
    High,
}

/// An xform should only focus on providing equivalent transformations of expressions.
#[enum_dispatch(XformImpl)]
pub trait Xform {
    /// Appends alternatives of `expr`, which matches [`Xform::pattern`], to `result`.
    ///
    /// Sub-trees of `expr` are shared by the alternatives, never modified.
    fn transform(
        &self,
        ctx: &OptimizerContext,
        expr: &Arc<Expression>,
        result: &mut XformResult,
    ) -> OptResult<()>;

    fn pattern(&self) -> &Pattern;

    /// Reads derived properties only.
    fn promise(&self, ctx: &OptimizerContext, handle: &ExpressionHandle) -> XformPromise;

    /// Use to identify each xform.
    ///
    /// This is used to avoid applying same xform repeatedly to same group expression.
    fn xform_id(&self) -> XformId;

    /// Xforms whose results this one must not be applied to.
    fn incompatible_xforms(&self) -> EnumSet<XformId> {
        EnumSet::empty()
    }

    fn is_compatible(&self, origin: XformId) -> bool {
        !self.incompatible_xforms().contains(origin)
    }
}

#[enum_dispatch]
#[derive(Clone, AsRefStr)]
pub enum XformImpl {
    // Exploration xforms
    JoinCommutativity,
    JoinAssociativity,
    LeftSemiJoin2InnerJoin,
    LeftSemiJoin2InnerJoinUnderGb,
    PruneGetColumns,
    Insert2Dml,
    Delete2Dml,

    // Implementation xforms
    Get2TableScan,
    DynamicGet2DynamicTableScan,
    ExternalGet2ExternalScan,
    IndexGet2IndexScan,
    DynamicIndexGet2DynamicIndexScan,
    BitmapTableGet2BitmapTableScan,
    DynamicBitmapTableGet2DynamicBitmapTableScan,
    Select2Filter,
    Project2ComputeScalar,
    InnerJoin2HashJoin,
    GbAgg2HashAgg,
    ImplementLimit,
    ImplementSequence,
    ImplementDml,
    ImplementSplit,
}

#[derive(EnumSetType, Debug, AsRefStr)]
pub enum XformId {
    // Exploration xforms
    JoinCommutativity,
    JoinAssociativity,
    LeftSemiJoin2InnerJoin,
    LeftSemiJoin2InnerJoinUnderGb,
    PruneGetColumns,
    Insert2Dml,
    Delete2Dml,

    // Implementation xforms
    Get2TableScan,
    DynamicGet2DynamicTableScan,
    ExternalGet2ExternalScan,
    IndexGet2IndexScan,
    DynamicIndexGet2DynamicIndexScan,
    BitmapTableGet2BitmapTableScan,
    DynamicBitmapTableGet2DynamicBitmapTableScan,
    Select2Filter,
    Project2ComputeScalar,
    InnerJoin2HashJoin,
    GbAgg2HashAgg,
    ImplementLimit,
    ImplementSequence,
    ImplementDml,
    ImplementSplit,
}

impl Debug for XformImpl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_ref())
    }
}

/// Every xform this crate defines.
pub fn all_xforms() -> Vec<XformImpl> {
    vec![
        JoinCommutativity::new().into(),
        JoinAssociativity::new().into(),
        LeftSemiJoin2InnerJoin::new().into(),
        LeftSemiJoin2InnerJoinUnderGb::new().into(),
        PruneGetColumns::new().into(),
        Insert2Dml::new().into(),
        Delete2Dml::new().into(),
        Get2TableScan::new().into(),
        DynamicGet2DynamicTableScan::new().into(),
        ExternalGet2ExternalScan::new().into(),
        IndexGet2IndexScan::new().into(),
        DynamicIndexGet2DynamicIndexScan::new().into(),
        BitmapTableGet2BitmapTableScan::new().into(),
        DynamicBitmapTableGet2DynamicBitmapTableScan::new().into(),
        Select2Filter::new().into(),
        Project2ComputeScalar::new().into(),
        InnerJoin2HashJoin::new().into(),
        GbAgg2HashAgg::new().into(),
        ImplementLimit::new().into(),
        ImplementSequence::new().into(),
        ImplementDml::new().into(),
        ImplementSplit::new().into(),
    ]
}
