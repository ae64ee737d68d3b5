use std::sync::Arc;

use crate::error::OptResult;
use crate::expression::{Expression, ExpressionHandle};
use crate::operator::LogicalOperator::*;
use crate::operator::Operator::{Logical, Physical};
use crate::operator::PhysicalOperator::*;
use crate::operator::{Operator, PhysicalOperator};
use crate::optimizer::OptimizerContext;
use crate::xforms::{pattern, Pattern, PatternBuilder, Xform, XformId, XformPromise, XformResult};

/// Physical alternative of `expr` over the very same children.
fn implement(expr: &Expression, op: PhysicalOperator, result: &mut XformResult) {
    result.add(Expression::build(Physical(op), expr.children().to_vec()));
}

fn mismatch(op: &Operator, xform: XformId) -> ! {
    panic!("{} doesn't match the pattern of {:?}", op.name(), xform)
}

/// Defines an xform turning one logical operator into the physical operator wrapping the same
/// struct.
macro_rules! implementation_xform {
    ($(#[$doc:meta])* $name:ident, $logical:ident => $physical:ident) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name {
            pattern: Pattern,
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    pattern: pattern(|op| matches!(op, Logical($logical(_))))
                        .multi_leaf()
                        .finish(),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Xform for $name {
            fn transform(
                &self,
                _ctx: &OptimizerContext,
                expr: &Arc<Expression>,
                result: &mut XformResult,
            ) -> OptResult<()> {
                match expr.operator() {
                    Logical($logical(op)) => implement(expr, $physical(op.clone()), result),
                    op => mismatch(op, self.xform_id()),
                }
                Ok(())
            }

            fn pattern(&self) -> &Pattern {
                &self.pattern
            }

            fn promise(&self, _ctx: &OptimizerContext, _handle: &ExpressionHandle) -> XformPromise {
                XformPromise::High
            }

            fn xform_id(&self) -> XformId {
                XformId::$name
            }
        }
    };
}

implementation_xform!(Get2TableScan, LogicalGet => PhysicalTableScan);
implementation_xform!(DynamicGet2DynamicTableScan, LogicalDynamicGet => PhysicalDynamicTableScan);
implementation_xform!(ExternalGet2ExternalScan, LogicalExternalGet => PhysicalExternalScan);
implementation_xform!(IndexGet2IndexScan, LogicalIndexGet => PhysicalIndexScan);
implementation_xform!(
    DynamicIndexGet2DynamicIndexScan,
    LogicalDynamicIndexGet => PhysicalDynamicIndexScan
);
implementation_xform!(BitmapTableGet2BitmapTableScan, LogicalBitmapTableGet => PhysicalBitmapTableScan);
implementation_xform!(
    DynamicBitmapTableGet2DynamicBitmapTableScan,
    LogicalDynamicBitmapTableGet => PhysicalDynamicBitmapTableScan
);
implementation_xform!(Select2Filter, LogicalSelect => PhysicalFilter);
implementation_xform!(Project2ComputeScalar, LogicalProject => PhysicalComputeScalar);
implementation_xform!(GbAgg2HashAgg, LogicalGbAgg => PhysicalHashAgg);
implementation_xform!(ImplementLimit, LogicalLimit => PhysicalLimit);
implementation_xform!(ImplementSequence, LogicalSequence => PhysicalSequence);
implementation_xform!(
    /// Lowers the DML operator produced by [`Insert2Dml`](crate::xforms::Insert2Dml) and
    /// [`Delete2Dml`](crate::xforms::Delete2Dml).
    ImplementDml,
    LogicalDml => PhysicalDml
);
implementation_xform!(ImplementSplit, LogicalSplit => PhysicalSplit);

lazy_static! {
    static ref INNER_JOIN_2_HASH_JOIN_PATTERN: Pattern = {
        pattern(|op| matches!(op, Logical(LogicalJoin(join)) if join.is_inner()))
            .leaf()
            .leaf()
            .tree()
        .finish()
    };
}

/// Implements an inner join as a hash join.
#[derive(Clone, Default)]
pub struct InnerJoin2HashJoin {}

impl InnerJoin2HashJoin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Xform for InnerJoin2HashJoin {
    fn transform(
        &self,
        _ctx: &OptimizerContext,
        expr: &Arc<Expression>,
        result: &mut XformResult,
    ) -> OptResult<()> {
        match expr.operator() {
            Logical(LogicalJoin(join)) if join.is_inner() => {
                implement(expr, PhysicalHashJoin(join.clone()), result)
            }
            op => mismatch(op, self.xform_id()),
        }
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &INNER_JOIN_2_HASH_JOIN_PATTERN
    }

    fn promise(&self, _ctx: &OptimizerContext, _handle: &ExpressionHandle) -> XformPromise {
        XformPromise::High
    }

    fn xform_id(&self) -> XformId {
        XformId::InnerJoin2HashJoin
    }
}
