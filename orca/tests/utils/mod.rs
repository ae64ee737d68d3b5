#![allow(dead_code)]

pub mod schema;

use std::sync::Arc;

use orca::column::ColRef;
use orca::expression::Expression;
use orca::metadata::MdId;
use orca::operator::LogicalOperator::{LogicalGet, LogicalJoin};
use orca::operator::{Get, Join};
use orca::optimizer::OptimizerContext;

/// Get over every column of `table`, with its output columns.
pub fn get(ctx: &OptimizerContext, table: MdId) -> (Arc<Expression>, Vec<ColRef>) {
    let get = Get::new(ctx, ctx.table_descriptor(table).unwrap());
    let cols = get.output_columns().to_vec();
    (Arc::new(Expression::new(LogicalGet(get), vec![]).unwrap()), cols)
}

pub fn join(
    join: Join,
    left: Arc<Expression>,
    right: Arc<Expression>,
    predicate: Arc<Expression>,
) -> Arc<Expression> {
    Arc::new(Expression::new(LogicalJoin(join), vec![left, right, predicate]).unwrap())
}
