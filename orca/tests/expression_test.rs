use std::collections::HashSet;
use std::sync::Arc;

use datafusion_common::ScalarValue;
use datafusion_expr::Operator as CmpOp;
use orca::column::ColRefMap;
use orca::expression::{explain_to_string, Expression};
use orca::operator::LogicalOperator::{
    LogicalBitmapTableGet, LogicalDynamicBitmapTableGet, LogicalDynamicGet,
    LogicalDynamicIndexGet, LogicalExternalGet, LogicalGet, LogicalIndexGet, LogicalLimit,
    LogicalSelect,
};
use orca::operator::{
    scalar, BitmapTableGet, DynamicBitmapTableGet, DynamicGet, DynamicIndexGet, DynamicScanBase,
    ExternalGet, Get, IndexGet, Limit, Operator, Select,
};
use orca::properties::{Constraint, Interval, OrderSpec};

use crate::utils::get;
use crate::utils::schema::{
    create_context, CUSTOMER, EVENTS, EVENTS_DAY_INDEX, ORDERS, ORDERS_CUSTOMER_INDEX, ORDER_LOG,
    STATE,
};

mod utils;

#[test]
fn test_get_column_order_is_significant() {
    let ctx = create_context();
    let mut hashes = HashSet::new();
    for table in [STATE, CUSTOMER, ORDERS] {
        let desc = ctx.table_descriptor(table).unwrap();
        let cols = Get::new(&ctx, desc.clone()).output_columns().to_vec();
        let reversed = cols.iter().rev().cloned().collect::<Vec<_>>();

        let forward = Operator::from(LogicalGet(Get::with_columns(desc.clone(), cols.clone())));
        let again = Operator::from(LogicalGet(Get::with_columns(desc.clone(), cols)));
        let backward = Operator::from(LogicalGet(Get::with_columns(desc, reversed)));

        assert!(forward.matches(&again));
        assert_eq!(forward.hash_value(), again.hash_value());
        assert!(!forward.matches(&backward));
        assert_ne!(forward.hash_value(), backward.hash_value());
        hashes.insert(forward.hash_value());
        hashes.insert(backward.hash_value());
    }
    assert_eq!(6, hashes.len());
}

fn constrain_day(base: &mut DynamicScanBase) {
    let day = base.part_columns()[0][0].clone();
    base.set_part_constraint(Constraint::Interval(
        Interval::from_cmp(day, CmpOp::Lt, ScalarValue::Int32(Some(200))).unwrap(),
    ));
}

#[test]
fn test_get_family_matches_implies_equal_hash() {
    let ctx = create_context();
    let orders = ctx.table_descriptor(ORDERS).unwrap();
    let events = ctx.table_descriptor(EVENTS).unwrap();
    let order_log = ctx.table_descriptor(ORDER_LOG).unwrap();
    let customer_index = ctx.index_descriptor(ORDERS_CUSTOMER_INDEX).unwrap();
    let day_index = ctx.index_descriptor(EVENTS_DAY_INDEX).unwrap();

    let get = Get::new(&ctx, orders.clone());
    let external = ExternalGet::new(&ctx, order_log).unwrap();
    let index_get = IndexGet::new(&ctx, orders.clone(), customer_index.clone());
    let reversed = index_get.output_columns().iter().rev().cloned().collect();
    let bitmap_get = BitmapTableGet::new(&ctx, orders.clone());

    let dynamic_get = DynamicGet::new(&ctx, events.clone()).unwrap();
    let mut other_scan = dynamic_get.clone();
    other_scan.base_mut().set_secondary_scan_id(dynamic_get.base().scan_id() + 1);

    let dynamic_index_get = DynamicIndexGet::new(&ctx, events.clone(), day_index).unwrap();
    let mut constrained = dynamic_index_get.clone();
    constrain_day(constrained.base_mut());

    let mut dynamic_bitmap_get = DynamicBitmapTableGet::new(&ctx, events).unwrap();
    constrain_day(dynamic_bitmap_get.base_mut());
    let mut partial = dynamic_bitmap_get.clone();
    partial.base_mut().set_partial(&ctx).unwrap();

    // Each entry: an operator, an independently built equal one, and one differing from it.
    let cases: Vec<(Operator, Operator, Operator)> = vec![
        (
            LogicalGet(get.clone()).into(),
            LogicalGet(Get::with_columns(orders.clone(), get.output_columns().to_vec())).into(),
            LogicalGet(Get::new(&ctx, orders.clone())).into(),
        ),
        (
            LogicalExternalGet(external.clone()).into(),
            LogicalExternalGet(external.clone()).into(),
            LogicalGet(Get::with_columns(
                external.table().clone(),
                external.output_columns().to_vec(),
            ))
            .into(),
        ),
        (
            LogicalIndexGet(index_get.clone()).into(),
            LogicalIndexGet(IndexGet::with_columns(
                orders.clone(),
                customer_index.clone(),
                index_get.output_columns().to_vec(),
            ))
            .into(),
            LogicalIndexGet(IndexGet::with_columns(orders, customer_index, reversed)).into(),
        ),
        (
            LogicalBitmapTableGet(bitmap_get.clone()).into(),
            LogicalBitmapTableGet(bitmap_get.clone()).into(),
            LogicalGet(Get::with_columns(
                bitmap_get.table().clone(),
                bitmap_get.output_columns().to_vec(),
            ))
            .into(),
        ),
        (
            LogicalDynamicGet(dynamic_get.clone()).into(),
            LogicalDynamicGet(dynamic_get).into(),
            LogicalDynamicGet(other_scan).into(),
        ),
        (
            LogicalDynamicIndexGet(dynamic_index_get.clone()).into(),
            LogicalDynamicIndexGet(dynamic_index_get).into(),
            LogicalDynamicIndexGet(constrained).into(),
        ),
        (
            LogicalDynamicBitmapTableGet(dynamic_bitmap_get.clone()).into(),
            LogicalDynamicBitmapTableGet(dynamic_bitmap_get).into(),
            LogicalDynamicBitmapTableGet(partial).into(),
        ),
    ];

    let mut hashes = HashSet::new();
    for (op, same, different) in &cases {
        assert!(op.matches(same), "{}", op);
        assert_eq!(op.hash_value(), same.hash_value(), "{}", op);
        assert!(!op.matches(different), "{}", op);
        assert_ne!(op.hash_value(), different.hash_value(), "{}", op);
        hashes.insert(op.hash_value());
    }
    assert_eq!(cases.len(), hashes.len());
}

#[test]
fn test_remap_round_trip() {
    let ctx = create_context();
    let (input, cols) = get(&ctx, CUSTOMER);
    let predicate = scalar::cmp(
        CmpOp::Gt,
        scalar::ident(cols[0].clone()),
        scalar::constant(ScalarValue::Int32(Some(10))),
    );
    let select = Arc::new(Expression::new(LogicalSelect(Select::new()), vec![input, predicate]).unwrap());

    let copies = cols
        .iter()
        .map(|c| ctx.column_factory().copy(c))
        .collect::<Vec<_>>();
    let forward: ColRefMap = cols.iter().zip(&copies).map(|(c, n)| (c.id(), n.clone())).collect();
    let backward: ColRefMap = copies.iter().zip(&cols).map(|(n, c)| (n.id(), c.clone())).collect();

    let copied = select.copy_with_remapped_columns(&forward, true).unwrap();
    assert!(!copied.matches(&select));
    assert!(copied
        .derive_relational()
        .output_columns()
        .iter()
        .all(|c| copies.contains(c)));

    let restored = copied.copy_with_remapped_columns(&backward, true).unwrap();
    assert!(restored.matches(&select));
    assert_eq!(select.derive_relational(), restored.derive_relational());
}

#[test]
fn test_remap_missing_column_must_exist() {
    let ctx = create_context();
    let (input, cols) = get(&ctx, STATE);
    let map: ColRefMap = std::iter::once((cols[0].id(), ctx.column_factory().copy(&cols[0]))).collect();

    assert!(input.copy_with_remapped_columns(&map, true).is_err());
    let partial = input.copy_with_remapped_columns(&map, false).unwrap();
    assert!(partial
        .derive_relational()
        .output_columns()
        .contains(&cols[1]));
}

#[test]
fn test_derivation_is_idempotent() {
    let ctx = create_context();
    let (input, _) = get(&ctx, ORDERS);
    let limit = Arc::new(
        Expression::new(
            LogicalLimit(Limit::new(OrderSpec::default(), 0, Some(3), true)),
            vec![input.clone()],
        )
        .unwrap(),
    );

    let first = limit.derive_relational();
    let stats = limit.derive_stats(&ctx).unwrap();
    assert!(Arc::ptr_eq(&first, &limit.derive_relational()));
    assert!(Arc::ptr_eq(&stats, &limit.derive_stats(&ctx).unwrap()));
    assert_eq!(1, limit.relational_derivation_count());
    assert_eq!(1, input.relational_derivation_count());
    assert_eq!(3, first.max_card().value());
    assert_eq!(3.0, stats.rows());
}

#[test]
fn test_explain_nests_children() {
    let ctx = create_context();
    let (input, cols) = get(&ctx, STATE);
    let predicate = scalar::is_null(scalar::ident(cols[1].clone()));
    let select = Expression::new(LogicalSelect(Select::new()), vec![input, predicate]).unwrap();

    let explained = explain_to_string(&select).unwrap();
    let lines = explained.lines().collect::<Vec<_>>();
    assert!(lines[0].starts_with("LogicalSelect"));
    assert!(lines.iter().any(|l| l.contains("LogicalGet")));
    assert!(lines.iter().any(|l| l.contains("ScalarIsNull")));
}
