use std::sync::Arc;

use crate::column::ColRefSet;
use crate::error::OptResult;
use crate::expression::Expression;
use crate::operator::Operator;
use crate::optimizer::OptimizerContext;
use crate::properties::{DrvdPropRelational, DrvdPropScalar, KeyCollection, MaxCard, PropConstraint};
use crate::search::{GroupExpr, GroupId, Memo};
use crate::stats::Statistics;

/// What derivation code looks at: an expression node, or a group expression whose children are
/// memo groups.
///
/// Operators only read their children's properties through the handle, so one derivation serves
/// initial trees and memo exploration alike.
#[derive(Clone, Copy)]
pub enum ExpressionHandle<'a> {
    Expr(&'a Expression),
    GroupExpr(&'a Memo, &'a GroupExpr),
}

impl<'a> ExpressionHandle<'a> {
    pub fn operator(&self) -> &'a Operator {
        match *self {
            ExpressionHandle::Expr(expr) => expr.operator(),
            ExpressionHandle::GroupExpr(_, group_expr) => group_expr.operator(),
        }
    }

    pub fn arity(&self) -> usize {
        match *self {
            ExpressionHandle::Expr(expr) => expr.arity(),
            ExpressionHandle::GroupExpr(_, group_expr) => group_expr.inputs().len(),
        }
    }

    fn child_group(&self, memo: &Memo, group_expr: &GroupExpr, idx: usize) -> GroupId {
        let group_id = group_expr.inputs()[idx];
        assert!(
            memo.contains(group_id),
            "Child {} of {} refers to missing group {}",
            idx,
            group_expr.operator().name(),
            group_id
        );
        group_id
    }

    pub fn is_scalar_child(&self, idx: usize) -> bool {
        match *self {
            ExpressionHandle::Expr(expr) => expr[idx].is_scalar(),
            ExpressionHandle::GroupExpr(memo, group_expr) => {
                memo[self.child_group(memo, group_expr, idx)].is_scalar()
            }
        }
    }

    /// Positions of relational children.
    pub fn relational_children(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.arity()).filter(move |idx| !self.is_scalar_child(*idx))
    }

    /// # Panics
    ///
    /// If child `idx` is scalar.
    pub fn child_relational(&self, idx: usize) -> Arc<DrvdPropRelational> {
        match *self {
            ExpressionHandle::Expr(expr) => expr[idx].derive_relational(),
            ExpressionHandle::GroupExpr(memo, group_expr) => {
                memo[self.child_group(memo, group_expr, idx)].relational_props()
            }
        }
    }

    /// # Panics
    ///
    /// If child `idx` is relational.
    pub fn child_scalar_props(&self, idx: usize) -> Arc<DrvdPropScalar> {
        match *self {
            ExpressionHandle::Expr(expr) => expr[idx].derive_scalar(),
            ExpressionHandle::GroupExpr(memo, group_expr) => {
                memo[self.child_group(memo, group_expr, idx)].scalar_props()
            }
        }
    }

    /// The scalar tree of child `idx`, e.g. the predicate of a select.
    ///
    /// # Panics
    ///
    /// If child `idx` is relational.
    pub fn scalar_child(&self, idx: usize) -> Arc<Expression> {
        assert!(
            self.is_scalar_child(idx),
            "Child {} of {} is not scalar",
            idx,
            self.operator().name()
        );
        match *self {
            ExpressionHandle::Expr(expr) => expr[idx].clone(),
            ExpressionHandle::GroupExpr(memo, group_expr) => {
                memo[self.child_group(memo, group_expr, idx)].scalar_expr()
            }
        }
    }

    pub fn child_stats(&self, idx: usize, ctx: &OptimizerContext) -> OptResult<Arc<Statistics>> {
        match *self {
            ExpressionHandle::Expr(expr) => expr[idx].derive_stats(ctx),
            ExpressionHandle::GroupExpr(memo, group_expr) => {
                memo.group_stats(self.child_group(memo, group_expr, idx), ctx)
            }
        }
    }

    pub fn derive_output_columns_pass_through(&self, idx: usize) -> ColRefSet {
        self.child_relational(idx).output_columns().clone()
    }

    pub fn derive_key_collection_pass_through(&self, idx: usize) -> KeyCollection {
        self.child_relational(idx).key_collection().clone()
    }

    pub fn derive_constraint_pass_through(&self, idx: usize) -> PropConstraint {
        self.child_relational(idx).constraint().clone()
    }

    pub fn derive_max_card_pass_through(&self, idx: usize) -> MaxCard {
        self.child_relational(idx).max_card()
    }
}
