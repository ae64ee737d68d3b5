use std::sync::Arc;

use orca::expression::{Expression, ExpressionHandle};
use orca::operator::LogicalOperator::{LogicalGbAgg, LogicalGet, LogicalJoin};
use orca::operator::Operator::Logical;
use orca::operator::{scalar, Join};
use orca::optimizer::OptimizerConfig;
use orca::search::Explorer;
use orca::xforms::{
    JoinAssociativity, JoinCommutativity, LeftSemiJoin2InnerJoin, Xform, XformId, XformPromise,
    XformResult,
};

use crate::utils::schema::{create_context, create_context_with_config, CUSTOMER, ORDERS, STATE};
use crate::utils::{get, join};

mod utils;

fn transform<X: Xform>(xform: &X, expr: &Arc<Expression>) -> Vec<Arc<Expression>> {
    let ctx = create_context();
    let mut result = XformResult::new();
    xform.transform(&ctx, expr, &mut result).unwrap();
    result.results().collect()
}

#[test]
fn test_commutativity_not_reapplied_to_its_result() {
    let ctx = create_context();
    let (customer, c_cols) = get(&ctx, CUSTOMER);
    let (orders, o_cols) = get(&ctx, ORDERS);
    let predicate = scalar::column_eq(c_cols[0].clone(), o_cols[1].clone());
    let expr = join(Join::inner(), customer.clone(), orders.clone(), predicate.clone());

    let swapped = transform(&JoinCommutativity::new(), &expr);
    assert_eq!(1, swapped.len());
    assert!(swapped[0][0].matches(&orders));
    assert!(swapped[0][1].matches(&customer));
    assert!(swapped[0][2].matches(&predicate));

    let result = Explorer::new(&ctx, vec![JoinCommutativity::new().into()])
        .explore(&expr)
        .unwrap();
    let memo = result.memo();
    let root = &memo[memo.root()];
    let exprs = root.logical_exprs().collect::<Vec<_>>();
    assert_eq!(2, exprs.len());
    assert_eq!(Some(XformId::JoinCommutativity), exprs[1].origin());
    assert!(!JoinCommutativity::new().is_compatible(XformId::JoinCommutativity));
    assert!(exprs[1].is_applied(XformId::JoinCommutativity));
    assert_eq!(1, result.applied());
}

#[test]
fn test_semi_join_on_inner_key_needs_no_grouping() {
    let ctx = create_context();
    let (orders, o_cols) = get(&ctx, ORDERS);
    let (customer, c_cols) = get(&ctx, CUSTOMER);
    let semi = join(
        Join::left_semi(),
        orders,
        customer.clone(),
        scalar::column_eq(o_cols[1].clone(), c_cols[0].clone()),
    );
    let xform = LeftSemiJoin2InnerJoin::new();
    assert_eq!(
        XformPromise::High,
        xform.promise(&ctx, &ExpressionHandle::Expr(&semi))
    );

    let alternatives = transform(&xform, &semi);
    assert_eq!(1, alternatives.len());
    match alternatives[0].operator() {
        Logical(LogicalJoin(join)) => assert!(join.is_inner()),
        op => panic!("Unexpected {}", op),
    }
    assert!(matches!(alternatives[0][1].operator(), Logical(LogicalGet(_))));
    assert!(Arc::ptr_eq(&customer, &alternatives[0][1]));
}

#[test]
fn test_semi_join_on_non_key_groups_inner_side() {
    let ctx = create_context();
    let (customer, c_cols) = get(&ctx, CUSTOMER);
    let (orders, o_cols) = get(&ctx, ORDERS);
    let semi = join(
        Join::left_semi(),
        customer,
        orders.clone(),
        scalar::column_eq(c_cols[0].clone(), o_cols[1].clone()),
    );

    let alternatives = transform(&LeftSemiJoin2InnerJoin::new(), &semi);
    assert_eq!(1, alternatives.len());
    let inner = &alternatives[0][1];
    match inner.operator() {
        Logical(LogicalGbAgg(gb)) => assert_eq!(&o_cols[1..2], gb.grouping_columns()),
        op => panic!("Unexpected {}", op),
    }
    assert!(Arc::ptr_eq(&orders, &inner[0]));
    assert!(inner
        .derive_relational()
        .key_collection()
        .has_key_within(&std::iter::once(&o_cols[1]).collect()));
}

#[test]
fn test_associativity_moves_predicates() {
    let ctx = create_context();
    let (customer, c_cols) = get(&ctx, CUSTOMER);
    let (orders, o_cols) = get(&ctx, ORDERS);
    let (state, s_cols) = get(&ctx, STATE);

    let c_o = scalar::column_eq(c_cols[0].clone(), o_cols[1].clone());
    let c_s = scalar::column_eq(c_cols[2].clone(), s_cols[0].clone());
    let lower = join(Join::inner(), customer, orders.clone(), c_o.clone());
    let expr = join(Join::inner(), lower, state.clone(), c_s.clone());

    let alternatives = transform(&JoinAssociativity::new(), &expr);
    assert_eq!(1, alternatives.len());
    let new_lower = &alternatives[0][0];
    assert!(new_lower[1].matches(&state));
    assert!(new_lower[2].matches(&c_s));
    assert!(alternatives[0][1].matches(&orders));
    assert!(alternatives[0][2].matches(&c_o));
    assert_eq!(
        expr.derive_relational().output_columns(),
        alternatives[0].derive_relational().output_columns()
    );
    assert_eq!(3, alternatives[0].derive_relational().join_depth());
}

#[test]
fn test_associativity_promise_respects_depth_limit() {
    let ctx = create_context_with_config(
        OptimizerConfig::default().with_max_join_depth_for_associativity(2),
    );
    let (customer, c_cols) = get(&ctx, CUSTOMER);
    let (orders, o_cols) = get(&ctx, ORDERS);
    let (state, s_cols) = get(&ctx, STATE);
    let lower = join(
        Join::inner(),
        customer,
        orders,
        scalar::column_eq(c_cols[0].clone(), o_cols[1].clone()),
    );
    let expr = join(
        Join::inner(),
        lower,
        state,
        scalar::column_eq(c_cols[2].clone(), s_cols[0].clone()),
    );

    let handle = ExpressionHandle::Expr(&expr);
    assert_eq!(XformPromise::None, JoinAssociativity::new().promise(&ctx, &handle));
    assert_eq!(
        XformPromise::High,
        JoinAssociativity::new().promise(&create_context(), &handle)
    );
}
