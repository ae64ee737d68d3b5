//! Builders and inspectors of scalar expressions.
use std::sync::Arc;

use datafusion_common::ScalarValue;
use datafusion_expr::Operator as CmpOp;

use crate::column::ColRef;
use crate::expression::Expression;
use crate::metadata::IndexDescriptorRef;
use crate::operator::scalar::ScalarOperator::{
    ScalarBitmapIndexProbe, ScalarBoolOp, ScalarCmp, ScalarConst, ScalarIdent, ScalarIsNull,
    ScalarProjectElement, ScalarProjectList,
};
use crate::operator::scalar::{
    BitmapIndexProbe, BoolOp, BoolOpKind, Cmp, Const, Ident, IsNull, ProjectElement, ProjectList,
};
use crate::operator::Operator;

pub fn ident(column: ColRef) -> Arc<Expression> {
    Expression::build(ScalarIdent(Ident::new(column)), vec![])
}

pub fn constant(value: ScalarValue) -> Arc<Expression> {
    Expression::build(ScalarConst(Const::new(value)), vec![])
}

pub fn cmp(op: CmpOp, left: Arc<Expression>, right: Arc<Expression>) -> Arc<Expression> {
    Expression::build(ScalarCmp(Cmp::new(op)), vec![left, right])
}

/// `left = right` over two columns.
pub fn column_eq(left: ColRef, right: ColRef) -> Arc<Expression> {
    cmp(CmpOp::Eq, ident(left), ident(right))
}

pub fn not(expr: Arc<Expression>) -> Arc<Expression> {
    Expression::build(ScalarBoolOp(BoolOp::new(BoolOpKind::Not)), vec![expr])
}

pub fn is_null(expr: Arc<Expression>) -> Arc<Expression> {
    Expression::build(ScalarIsNull(IsNull::default()), vec![expr])
}

pub fn project_element(column: ColRef, expr: Arc<Expression>) -> Arc<Expression> {
    Expression::build(ScalarProjectElement(ProjectElement::new(column)), vec![expr])
}

pub fn project_list(elements: Vec<Arc<Expression>>) -> Arc<Expression> {
    Expression::build(ScalarProjectList(ProjectList::default()), elements)
}

/// Bitmap path probing `index` with `condition`.
pub fn bitmap_index_probe(index: IndexDescriptorRef, condition: Arc<Expression>) -> Arc<Expression> {
    Expression::build(ScalarBitmapIndexProbe(BitmapIndexProbe::new(index)), vec![condition])
}

fn bool_kind(expr: &Expression) -> Option<BoolOpKind> {
    match expr.operator() {
        Operator::Scalar(ScalarBoolOp(op)) => Some(op.kind()),
        _ => None,
    }
}

fn bool_const(expr: &Expression) -> Option<bool> {
    match constant_of(expr) {
        Some(ScalarValue::Boolean(Some(v))) => Some(*v),
        _ => None,
    }
}

pub fn is_const_true(expr: &Expression) -> bool {
    bool_const(expr) == Some(true)
}

fn combine(kind: BoolOpKind, exprs: Vec<Arc<Expression>>) -> Arc<Expression> {
    // `true` is neutral for AND, `false` for OR.
    let neutral = kind == BoolOpKind::And;
    let mut operands = Vec::with_capacity(exprs.len());
    for expr in exprs {
        if bool_kind(&expr) == Some(kind) {
            operands.extend(expr.children().iter().cloned());
        } else if bool_const(&expr) != Some(neutral) {
            operands.push(expr);
        }
    }

    match operands.len() {
        0 => constant(ScalarValue::Boolean(Some(neutral))),
        1 => operands.remove(0),
        _ => Expression::build(ScalarBoolOp(BoolOp::new(kind)), operands),
    }
}

/// AND of `exprs`, flattening nested conjunctions. An empty list is `true`.
pub fn conjunction(exprs: Vec<Arc<Expression>>) -> Arc<Expression> {
    combine(BoolOpKind::And, exprs)
}

/// OR of `exprs`, flattening nested disjunctions. An empty list is `false`.
pub fn disjunction(exprs: Vec<Arc<Expression>>) -> Arc<Expression> {
    combine(BoolOpKind::Or, exprs)
}

/// Conjuncts of a predicate. `true` has none.
pub fn split_conjuncts(expr: &Arc<Expression>) -> Vec<Arc<Expression>> {
    if is_const_true(expr) {
        return vec![];
    }
    if bool_kind(expr) == Some(BoolOpKind::And) {
        return expr.children().iter().flat_map(split_conjuncts).collect();
    }
    vec![expr.clone()]
}

pub fn column_of(expr: &Expression) -> Option<&ColRef> {
    match expr.operator() {
        Operator::Scalar(ScalarIdent(op)) => Some(op.column()),
        _ => None,
    }
}

pub fn constant_of(expr: &Expression) -> Option<&ScalarValue> {
    match expr.operator() {
        Operator::Scalar(ScalarConst(op)) => Some(op.value()),
        _ => None,
    }
}

/// The comparison obtained by swapping operands, `a < b` becomes `b > a`.
pub fn commute_op(op: CmpOp) -> Option<CmpOp> {
    match op {
        CmpOp::Eq | CmpOp::NotEq => Some(op),
        CmpOp::Lt => Some(CmpOp::Gt),
        CmpOp::LtEq => Some(CmpOp::GtEq),
        CmpOp::Gt => Some(CmpOp::Lt),
        CmpOp::GtEq => Some(CmpOp::LtEq),
        _ => None,
    }
}

/// Columns of an `a = b` comparison between two distinct columns.
pub fn column_equality(expr: &Expression) -> Option<(ColRef, ColRef)> {
    match expr.operator() {
        Operator::Scalar(ScalarCmp(op)) if op.op() == CmpOp::Eq => {
            let left = column_of(&expr[0])?;
            let right = column_of(&expr[1])?;
            (left != right).then(|| (left.clone(), right.clone()))
        }
        _ => None,
    }
}
