use std::sync::Arc;

use datafusion_common::ScalarValue;
use datafusion_expr::Operator as CmpOp;
use orca::expression::Expression;
use orca::operator::LogicalOperator::LogicalDynamicGet;
use orca::operator::{DynamicGet, PartScanState};
use orca::properties::{Constraint, Interval};

use crate::utils::schema::{create_context, EVENTS};

mod utils;

fn day_constraint(get: &DynamicGet, op: CmpOp, day: i32) -> Constraint {
    let day_col = get.base().part_columns()[0][0].clone();
    Constraint::Interval(Interval::from_cmp(day_col, op, ScalarValue::Int32(Some(day))).unwrap())
}

fn expr(get: DynamicGet) -> Arc<Expression> {
    Arc::new(Expression::new(LogicalDynamicGet(get), vec![]).unwrap())
}

#[test]
fn test_partial_scan_estimates_fewer_rows() {
    let ctx = create_context();
    let table = ctx.table_descriptor(EVENTS).unwrap();
    let unbounded = DynamicGet::new(&ctx, table).unwrap();
    let mut partial = unbounded.clone();
    partial
        .base_mut()
        .set_part_constraint(day_constraint(&unbounded, CmpOp::Lt, 200));
    partial.base_mut().set_partial(&ctx).unwrap();
    assert!(partial.base().is_partial());

    let full_rows = expr(unbounded).derive_stats(&ctx).unwrap().rows();
    let partial_rows = expr(partial).derive_stats(&ctx).unwrap().rows();
    assert_eq!(1000.0, full_rows);
    assert!(partial_rows <= full_rows);
    assert!((partial_rows - 500.0).abs() < 1e-6);
}

#[test]
fn test_constraint_selects_matching_partitions() {
    let ctx = create_context();
    let table = ctx.table_descriptor(EVENTS).unwrap();
    let relation = ctx.md_accessor().retrieve_relation(EVENTS).unwrap();
    let mut get = DynamicGet::new(&ctx, table).unwrap();
    let constraint = day_constraint(&get, CmpOp::GtEq, 250);
    get.base_mut().set_part_constraint(constraint.clone());

    assert_eq!(&PartScanState::Constrained(constraint), get.base().state());
    assert_eq!(2, get.base().partitions_matching(&relation).len());
    // The partition list itself is never narrowed.
    assert_eq!(4, get.base().partitions().len());
}

#[test]
fn test_scan_ids_differ_per_scan() {
    let ctx = create_context();
    let table = ctx.table_descriptor(EVENTS).unwrap();
    let first = DynamicGet::new(&ctx, table.clone()).unwrap();
    let second = DynamicGet::new(&ctx, table).unwrap();
    assert_ne!(first.base().scan_id(), second.base().scan_id());
    assert_ne!(first, second);

    let props = expr(first.clone()).derive_relational();
    assert!(props.part_info().contains(first.base().scan_id()));
    assert!(!props.part_info().contains(second.base().scan_id()));
}

#[test]
#[should_panic(expected = "no partition constraint")]
fn test_partial_requires_constraint() {
    let ctx = create_context();
    let mut get = DynamicGet::new(&ctx, ctx.table_descriptor(EVENTS).unwrap()).unwrap();
    let _ = get.base_mut().set_partial(&ctx);
}
