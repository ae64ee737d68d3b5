use std::sync::Arc;

use crate::error::OptResult;
use crate::expression::{Expression, ExpressionHandle};
use crate::operator::LogicalOperator::{LogicalDelete, LogicalDml, LogicalInsert};
use crate::operator::Operator::Logical;
use crate::operator::{Dml, DmlAction};
use crate::optimizer::OptimizerContext;
use crate::xforms::{pattern, Pattern, PatternBuilder, Xform, XformId, XformPromise, XformResult};

lazy_static! {
    static ref INSERT_PATTERN: Pattern = {
        pattern(|op| matches!(op, Logical(LogicalInsert(_))))
            .leaf()
        .finish()
    };
    static ref DELETE_PATTERN: Pattern = {
        pattern(|op| matches!(op, Logical(LogicalDelete(_))))
            .leaf()
        .finish()
    };
}

/// Rewrites an insert into the generic DML operator over the same source.
#[derive(Clone, Default)]
pub struct Insert2Dml {}

impl Insert2Dml {
    pub fn new() -> Self {
        Self {}
    }
}

impl Xform for Insert2Dml {
    fn transform(
        &self,
        _ctx: &OptimizerContext,
        expr: &Arc<Expression>,
        result: &mut XformResult,
    ) -> OptResult<()> {
        let insert = match expr.operator() {
            Logical(LogicalInsert(insert)) => insert,
            op => panic!("{} doesn't match the pattern of {:?}", op.name(), self.xform_id()),
        };
        let dml = Dml::new(
            DmlAction::Insert,
            insert.table().clone(),
            insert.source_columns().to_vec(),
        );
        result.add(Expression::build(
            Logical(LogicalDml(dml)),
            vec![expr[0].clone()],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &INSERT_PATTERN
    }

    fn promise(&self, _ctx: &OptimizerContext, _handle: &ExpressionHandle) -> XformPromise {
        XformPromise::High
    }

    fn xform_id(&self) -> XformId {
        XformId::Insert2Dml
    }
}

/// Rewrites a delete into the generic DML operator, keeping the row locator columns.
#[derive(Clone, Default)]
pub struct Delete2Dml {}

impl Delete2Dml {
    pub fn new() -> Self {
        Self {}
    }
}

impl Xform for Delete2Dml {
    fn transform(
        &self,
        _ctx: &OptimizerContext,
        expr: &Arc<Expression>,
        result: &mut XformResult,
    ) -> OptResult<()> {
        let delete = match expr.operator() {
            Logical(LogicalDelete(delete)) => delete,
            op => panic!("{} doesn't match the pattern of {:?}", op.name(), self.xform_id()),
        };
        let dml = Dml::new(
            DmlAction::Delete,
            delete.table().clone(),
            delete.columns().to_vec(),
        )
        .with_row_locator(delete.ctid().clone(), delete.segment_id().clone());
        result.add(Expression::build(
            Logical(LogicalDml(dml)),
            vec![expr[0].clone()],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &DELETE_PATTERN
    }

    fn promise(&self, _ctx: &OptimizerContext, _handle: &ExpressionHandle) -> XformPromise {
        XformPromise::High
    }

    fn xform_id(&self) -> XformId {
        XformId::Delete2Dml
    }
}
