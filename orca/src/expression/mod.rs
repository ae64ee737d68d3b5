//! Expression trees and the handle derivations run against.
//!
//! An [`Expression`] is an immutable operator node over shared (`Arc`) children. Derived
//! properties are computed on first access and cached on the node, so an expression and every
//! tree sharing it see one derivation only.
//!
//! The `Arc` is for structural sharing between alternatives of one session. Expressions hold
//! `Cell`/`OnceCell` caches, so they are `!Sync` and stay on the thread of the session that
//! built them. Independent sessions run in parallel, each with its own trees.
mod explain;
pub use explain::*;
mod handle;
pub use handle::*;

use std::cell::{Cell, OnceCell};
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::Index;
use std::sync::Arc;

use itertools::Itertools;
use smallvec::SmallVec;

use crate::column::ColRefMap;
use crate::error::OptError::InvalidArgument;
use crate::error::OptResult;
use crate::operator::{
    DerivePropContext, DerivePropResult, Operator, PatternOperator, PhysicalOperatorTrait,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{DrvdPropRelational, DrvdPropScalar, PhysicalPropertySet};
use crate::search::GroupId;
use crate::stats::Statistics;

pub type ExprVec = SmallVec<[Arc<Expression>; 3]>;

/// Memo group a leaf stands for, with the group's properties captured at binding time.
#[derive(Clone)]
struct GroupBinding {
    group_id: GroupId,
    relational_props: Arc<DrvdPropRelational>,
    stats: Option<Arc<Statistics>>,
}

pub struct Expression {
    operator: Operator,
    children: ExprVec,
    group: Option<GroupBinding>,
    relational_props: OnceCell<Arc<DrvdPropRelational>>,
    scalar_props: OnceCell<Arc<DrvdPropScalar>>,
    stats: OnceCell<Arc<Statistics>>,
    relational_derivations: Cell<usize>,
}

impl Expression {
    /// Creates an expression after checking `children` against the operator's arity and child
    /// kinds.
    pub fn new<O: Into<Operator>>(operator: O, children: Vec<Arc<Expression>>) -> OptResult<Self> {
        let operator = operator.into();
        if operator.is_pattern() {
            return Err(InvalidArgument(format!(
                "{} can't be used in an expression",
                operator.name()
            )));
        }
        if !operator.arity().accepts(children.len()) {
            return Err(InvalidArgument(format!(
                "{} doesn't accept {} children, expected {:?}",
                operator.name(),
                children.len(),
                operator.arity()
            )));
        }
        let child_count = children.len();
        for (pos, child) in children.iter().enumerate() {
            let expects_scalar = operator.expects_scalar_child(pos, child_count);
            if expects_scalar != child.is_scalar() {
                return Err(InvalidArgument(format!(
                    "Child {} of {} must be {}",
                    pos,
                    operator.name(),
                    if expects_scalar { "scalar" } else { "relational" }
                )));
            }
        }

        Ok(Self::with_children(operator, children.into_iter().collect(), None))
    }

    /// Shorthand of [`Expression::new`] for trees built by the framework itself.
    ///
    /// # Panics
    ///
    /// If the children don't fit the operator.
    pub(crate) fn build<O: Into<Operator>>(
        operator: O,
        children: Vec<Arc<Expression>>,
    ) -> Arc<Expression> {
        match Self::new(operator, children) {
            Ok(expr) => Arc::new(expr),
            Err(e) => panic!("Malformed expression: {}", e),
        }
    }

    /// A relational leaf standing for a whole memo group.
    pub(crate) fn group_leaf(
        group_id: GroupId,
        relational_props: Arc<DrvdPropRelational>,
        stats: Option<Arc<Statistics>>,
    ) -> Arc<Expression> {
        Arc::new(Self::with_children(
            Operator::Pattern(PatternOperator::PatternLeaf),
            ExprVec::new(),
            Some(GroupBinding {
                group_id,
                relational_props,
                stats,
            }),
        ))
    }

    fn with_children(operator: Operator, children: ExprVec, group: Option<GroupBinding>) -> Self {
        Self {
            operator,
            children,
            group,
            relational_props: OnceCell::new(),
            scalar_props: OnceCell::new(),
            stats: OnceCell::new(),
            relational_derivations: Cell::new(0),
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn children(&self) -> &[Arc<Expression>] {
        &self.children
    }

    pub fn arity(&self) -> usize {
        self.children.len()
    }

    /// Memo group this leaf is bound to.
    pub fn group_id(&self) -> Option<GroupId> {
        self.group.as_ref().map(|g| g.group_id)
    }

    pub fn is_scalar(&self) -> bool {
        self.operator.is_scalar()
    }

    /// Relational expressions and group bound leaves.
    pub fn is_relational(&self) -> bool {
        self.operator.is_relational() || self.group.is_some()
    }

    /// Derives relational properties of this node, once.
    ///
    /// # Panics
    ///
    /// If the expression is scalar.
    pub fn derive_relational(&self) -> Arc<DrvdPropRelational> {
        if let Some(group) = &self.group {
            return group.relational_props.clone();
        }
        self.relational_props
            .get_or_init(|| {
                self.relational_derivations
                    .set(self.relational_derivations.get() + 1);
                Arc::new(DrvdPropRelational::derive(&ExpressionHandle::Expr(self)))
            })
            .clone()
    }

    /// Derives scalar properties of this node, once.
    ///
    /// # Panics
    ///
    /// If the expression is relational.
    pub fn derive_scalar(&self) -> Arc<DrvdPropScalar> {
        self.scalar_props
            .get_or_init(|| Arc::new(DrvdPropScalar::derive(&ExpressionHandle::Expr(self))))
            .clone()
    }

    /// Estimates the statistics of this node, once.
    pub fn derive_stats(&self, ctx: &OptimizerContext) -> OptResult<Arc<Statistics>> {
        if let Some(group) = &self.group {
            return group.stats.clone().ok_or_else(|| {
                InvalidArgument(format!(
                    "Statistics of group {} were not derived",
                    group.group_id
                ))
            });
        }
        if let Some(stats) = self.stats.get() {
            return Ok(stats.clone());
        }
        let stats = Arc::new(
            self.operator
                .as_relational()
                .derive_stats(&ExpressionHandle::Expr(self), ctx)?,
        );
        Ok(self.stats.get_or_init(|| stats).clone())
    }

    /// Physical property alternatives of this node under `required`.
    ///
    /// # Panics
    ///
    /// If the operator isn't physical.
    pub fn derive_plan_properties(
        &self,
        required: &PhysicalPropertySet,
    ) -> OptResult<Vec<DerivePropResult>> {
        let op = match self.operator.as_physical() {
            Some(op) => op,
            None => panic!("{} is not a physical operator", self.operator.name()),
        };
        let handle = ExpressionHandle::Expr(self);
        op.derive_properties(DerivePropContext {
            required_prop: required,
            expr_handle: &handle,
        })
    }

    /// Number of times relational properties were computed for this node.
    pub fn relational_derivation_count(&self) -> usize {
        self.relational_derivations.get()
    }

    /// Structural equality of the whole tree.
    pub fn matches(&self, other: &Expression) -> bool {
        self == other
    }

    /// Builds a new tree with every operator remapped. The source tree is left untouched.
    ///
    /// # Panics
    ///
    /// If the tree contains group bound leaves.
    pub fn copy_with_remapped_columns(
        &self,
        map: &ColRefMap,
        must_exist: bool,
    ) -> OptResult<Arc<Expression>> {
        assert!(
            self.group.is_none(),
            "Can't remap a leaf bound to group {:?}",
            self.group_id()
        );
        let operator = self.operator.copy_with_remapped_columns(map, must_exist)?;
        let children: ExprVec = self
            .children
            .iter()
            .map(|c| c.copy_with_remapped_columns(map, must_exist))
            .try_collect()?;
        Ok(Arc::new(Self::with_children(operator, children, None)))
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.group_id() == other.group_id()
            && self.operator.matches(&other.operator)
            && self.children == other.children
    }
}

impl Eq for Expression {}

impl Hash for Expression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id().hash(state);
        self.operator.hash(state);
        self.children.hash(state);
    }
}

impl Debug for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.group_id() {
            Some(id) => write!(f, "Group({})", id),
            None if self.children.is_empty() => write!(f, "{}", self.operator),
            None => write!(
                f,
                "{}[{}]",
                self.operator,
                self.children.iter().map(|c| format!("{:?}", c)).join(", ")
            ),
        }
    }
}

/// Index of children.
impl Index<usize> for Expression {
    type Output = Arc<Expression>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.children[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::identity_map;
    use crate::operator::LogicalOperator::{LogicalLimit, LogicalSelect};
    use crate::operator::{scalar, Limit, Select};
    use crate::properties::OrderSpec;
    use crate::test_utils::{employee_context, employee_table, get_expr};
    use datafusion_common::ScalarValue;
    use datafusion_expr::Operator as CmpOp;

    #[test]
    fn test_shared_child_derived_once() {
        let ctx = employee_context();
        let (get, _) = get_expr(&ctx, employee_table(&ctx));
        let limit = |count| {
            Expression::build(
                LogicalLimit(Limit::new(OrderSpec::default(), 0, Some(count), true)),
                vec![get.clone()],
            )
        };
        let (first, second) = (limit(5), limit(7));

        assert_eq!(5, first.derive_relational().max_card().value());
        assert_eq!(7, second.derive_relational().max_card().value());
        assert!(Arc::ptr_eq(&first[0], &second[0]));
        assert_eq!(1, get.relational_derivation_count());
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let limit = Limit::new(OrderSpec::default(), 0, Some(1), true);
        let result = Expression::new(LogicalLimit(limit), vec![]);
        assert!(matches!(result, Err(InvalidArgument(_))));
    }

    #[test]
    fn test_scalar_child_position_checked() {
        let ctx = employee_context();
        let (get, cols) = get_expr(&ctx, employee_table(&ctx));
        let predicate = scalar::cmp(
            CmpOp::Gt,
            scalar::ident(cols[0].clone()),
            scalar::constant(ScalarValue::Int32(Some(1))),
        );
        assert!(Expression::new(LogicalSelect(Select::new()), vec![predicate, get]).is_err());
    }

    #[test]
    fn test_derivation_cached() {
        let ctx = employee_context();
        let (get, _) = get_expr(&ctx, employee_table(&ctx));
        let first = get.derive_relational();
        let second = get.derive_relational();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(1, get.relational_derivation_count());
    }

    #[test]
    fn test_remap_identity_matches() {
        let ctx = employee_context();
        let (get, cols) = get_expr(&ctx, employee_table(&ctx));
        let predicate = scalar::column_eq(cols[0].clone(), cols[2].clone());
        let select = Expression::build(LogicalSelect(Select::new()), vec![get, predicate]);

        let copy = select
            .copy_with_remapped_columns(&identity_map(&cols), true)
            .unwrap();
        assert!(copy.matches(&select));
        assert!(!Arc::ptr_eq(&copy, &select));
        assert_eq!(0, copy.relational_derivation_count());
    }
}
