//! Contains relational and scalar operators such as get, join, limit, comparison, etc.
//!
//! Operators are classified into four categories: logical, physical, scalar and pattern. Logical
//! and physical operators are relational and share the derivation contract of
//! [`RelationalOperatorTrait`]. Most physical operators reuse the struct of their logical
//! counterpart, e.g. [`PhysicalOperator::PhysicalTableScan`] wraps a [`Get`].
mod logical;
pub use logical::*;
mod physical;
pub use physical::*;
mod pattern;
pub use pattern::*;
mod get;
pub use get::*;
mod dynamic_get;
pub use dynamic_get::*;
mod index_get;
pub use index_get::*;
mod bitmap_get;
pub use bitmap_get::*;
mod select;
pub use select::*;
mod project;
pub use project::*;
mod join;
pub use join::*;
mod gb_agg;
pub use gb_agg::*;
mod limit;
pub use limit::*;
mod sequence;
pub use sequence::*;
mod dml;
pub use dml::*;
pub mod scalar;
pub use scalar::{
    BitmapIndexProbe, BoolOp, BoolOpKind, Cmp, Const, Func, Ident, IsNull, ProjectElement,
    ProjectList, ScalarOperator, ScalarOperatorId, ScalarOperatorTrait, Subquery,
};

use std::collections::hash_map::DefaultHasher;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use enum_as_inner::EnumAsInner;
use enum_dispatch::enum_dispatch;

use crate::column::{ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::expression::ExpressionHandle;
use crate::operator::Operator::{Logical, Pattern, Physical, Scalar};
use crate::optimizer::OptimizerContext;
use crate::properties::{KeyCollection, MaxCard, PartInfo, PropConstraint};
use crate::stats::Statistics;

#[derive(Clone, Debug, Hash, Eq, PartialEq, EnumAsInner)]
pub enum Operator {
    Logical(LogicalOperator),
    Physical(PhysicalOperator),
    Scalar(ScalarOperator),
    Pattern(PatternOperator),
}

/// Stable identity of an operator kind.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum OperatorId {
    Logical(LogicalOperatorId),
    Physical(PhysicalOperatorId),
    Scalar(ScalarOperatorId),
    Pattern(PatternOperator),
}

/// Number of children an operator accepts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Arity {
    Fixed(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, children: usize) -> bool {
        match self {
            Arity::Fixed(n) => children == *n,
            Arity::AtLeast(n) => children >= *n,
        }
    }
}

/// Prints operator specific fields after the operator name.
#[enum_dispatch(LogicalOperator, PhysicalOperator, ScalarOperator)]
pub trait DisplayFields {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result;
}

/// Replaces every column an operator carries.
pub trait RemapColumns: Sized {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self>;
}

/// Derivation contract of relational operators.
///
/// Methods taking an [`ExpressionHandle`] may read the derived properties of the handle's
/// children but never the handle's own properties, which are being computed.
#[enum_dispatch(LogicalOperator, PhysicalOperator)]
pub trait RelationalOperatorTrait {
    fn arity(&self) -> Arity;

    /// Number of trailing scalar children, e.g. the predicate of a join.
    fn scalar_child_count(&self) -> usize {
        0
    }

    fn derive_output_columns(&self, handle: &ExpressionHandle) -> ColRefSet;

    fn derive_not_null_columns(&self, handle: &ExpressionHandle, output: &ColRefSet) -> ColRefSet {
        let mut not_null = ColRefSet::new();
        for i in handle.relational_children() {
            not_null.include_all(handle.child_relational(i).not_null_columns().iter());
        }
        not_null.intersection(output)
    }

    /// Columns used below this operator but produced by none of its children.
    fn derive_outer_references(&self, handle: &ExpressionHandle) -> ColRefSet {
        let mut used = ColRefSet::new();
        let mut produced = ColRefSet::new();
        for i in 0..handle.arity() {
            if handle.is_scalar_child(i) {
                used.include_all(handle.child_scalar_props(i).used_columns().iter());
            } else {
                let child = handle.child_relational(i);
                used.include_all(child.outer_references().iter());
                produced.include_all(child.output_columns().iter());
            }
        }
        used.difference(&produced)
    }

    fn derive_key_collection(&self, _handle: &ExpressionHandle) -> KeyCollection {
        KeyCollection::new()
    }

    fn derive_constraint(&self, _handle: &ExpressionHandle) -> PropConstraint {
        PropConstraint::empty()
    }

    fn derive_part_info(&self, handle: &ExpressionHandle) -> PartInfo {
        handle
            .relational_children()
            .map(|i| handle.child_relational(i).part_info().clone())
            .fold(PartInfo::new(), |acc, p| acc.combine(&p))
    }

    fn derive_max_card(&self, handle: &ExpressionHandle) -> MaxCard;

    fn derive_join_depth(&self, handle: &ExpressionHandle) -> usize {
        handle
            .relational_children()
            .map(|i| handle.child_relational(i).join_depth())
            .sum()
    }

    fn derive_stats(
        &self,
        handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics>;
}

impl Operator {
    pub fn operator_id(&self) -> OperatorId {
        match self {
            Logical(op) => OperatorId::Logical(op.into()),
            Physical(op) => OperatorId::Physical(op.into()),
            Scalar(op) => OperatorId::Scalar(op.into()),
            Pattern(op) => OperatorId::Pattern(*op),
        }
    }

    /// Debug name, e.g. `LogicalGet`.
    pub fn name(&self) -> &str {
        match self {
            Logical(op) => op.as_ref(),
            Physical(op) => op.as_ref(),
            Scalar(op) => op.as_ref(),
            Pattern(op) => op.as_ref(),
        }
    }

    pub fn is_relational(&self) -> bool {
        self.is_logical() || self.is_physical()
    }

    pub fn arity(&self) -> Arity {
        match self {
            Logical(op) => op.arity(),
            Physical(op) => op.arity(),
            Scalar(op) => op.arity(),
            Pattern(_) => Arity::Fixed(0),
        }
    }

    /// Whether child `pos` of `child_count` children must be a scalar expression.
    pub fn expects_scalar_child(&self, pos: usize, child_count: usize) -> bool {
        match self {
            Logical(op) => pos + op.scalar_child_count() >= child_count,
            Physical(op) => pos + op.scalar_child_count() >= child_count,
            Scalar(op) => !op.has_relational_child(),
            Pattern(_) => false,
        }
    }

    /// Relational view of this operator.
    ///
    /// # Panics
    ///
    /// If the operator is scalar or a pattern.
    pub fn as_relational(&self) -> &dyn RelationalOperatorTrait {
        match self {
            Logical(op) => op,
            Physical(op) => op,
            _ => panic!("{} is not a relational operator", self.name()),
        }
    }

    /// Structural equality. Same kind, same configuration and same columns in the same order.
    pub fn matches(&self, other: &Operator) -> bool {
        self == other
    }

    /// Consistent with [`Operator::matches`]: matching operators have equal hash values.
    pub fn hash_value(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Copies the operator with columns replaced. Table and index descriptors stay shared.
    pub fn copy_with_remapped_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Operator> {
        Ok(match self {
            Logical(op) => Logical(op.remap_columns(map, must_exist)?),
            Physical(op) => Physical(op.remap_columns(map, must_exist)?),
            Scalar(op) => Scalar(op.remap_columns(map, must_exist)?),
            Pattern(op) => Pattern(*op),
        })
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Logical(op) => write!(f, "{}", op),
            Physical(op) => write!(f, "{}", op),
            Scalar(op) => write!(f, "{}", op),
            Pattern(op) => write!(f, "{}", op.as_ref()),
        }
    }
}

impl From<LogicalOperator> for Operator {
    fn from(op: LogicalOperator) -> Self {
        Logical(op)
    }
}

impl From<PhysicalOperator> for Operator {
    fn from(op: PhysicalOperator) -> Self {
        Physical(op)
    }
}

impl From<ScalarOperator> for Operator {
    fn from(op: ScalarOperator) -> Self {
        Scalar(op)
    }
}
