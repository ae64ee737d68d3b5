use std::fmt::Formatter;

use datafusion_expr::JoinType;

use crate::column::{ColRef, ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::expression::{Expression, ExpressionHandle};
use crate::operator::scalar;
use crate::operator::{
    Arity, DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
    RelationalOperatorTrait, RemapColumns,
};
use crate::optimizer::OptimizerContext;
use crate::properties::{
    DistributionSpec, KeyCollection, MaxCard, PhysicalPropertySet, PropConstraint,
};
use crate::stats::Statistics;

/// Joins its first two children on the predicate in its last child.
///
/// Only inner and left semi joins are supported. A left semi join outputs the columns of its
/// outer (first) child only.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Join {
    join_type: JoinType,
}

impl Join {
    pub fn new(join_type: JoinType) -> Self {
        assert!(
            matches!(join_type, JoinType::Inner | JoinType::LeftSemi),
            "Unsupported join type {:?}",
            join_type
        );
        Self { join_type }
    }

    pub fn inner() -> Self {
        Self::new(JoinType::Inner)
    }

    pub fn left_semi() -> Self {
        Self::new(JoinType::LeftSemi)
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn is_inner(&self) -> bool {
        self.join_type == JoinType::Inner
    }
}

/// Pairs of columns compared for equality by `predicate`, left side first.
pub(crate) fn equi_join_columns(
    predicate: &std::sync::Arc<Expression>,
    left: &ColRefSet,
    right: &ColRefSet,
) -> (Vec<ColRef>, Vec<ColRef>) {
    scalar::split_conjuncts(predicate)
        .iter()
        .filter_map(|c| scalar::column_equality(c))
        .filter_map(|(a, b)| {
            if left.contains(&a) && right.contains(&b) {
                Some((a, b))
            } else if left.contains(&b) && right.contains(&a) {
                Some((b, a))
            } else {
                None
            }
        })
        .unzip()
}

impl RelationalOperatorTrait for Join {
    fn arity(&self) -> Arity {
        Arity::Fixed(3)
    }

    fn scalar_child_count(&self) -> usize {
        1
    }

    fn derive_output_columns(&self, handle: &ExpressionHandle) -> ColRefSet {
        let outer = handle.child_relational(0).output_columns().clone();
        if self.is_inner() {
            outer.union(handle.child_relational(1).output_columns())
        } else {
            outer
        }
    }

    fn derive_key_collection(&self, handle: &ExpressionHandle) -> KeyCollection {
        let outer = handle.child_relational(0).key_collection().clone();
        if self.is_inner() {
            outer.combine(handle.child_relational(1).key_collection())
        } else {
            outer
        }
    }

    fn derive_constraint(&self, handle: &ExpressionHandle) -> PropConstraint {
        let outer = handle.child_relational(0).constraint().clone();
        if !self.is_inner() {
            return outer;
        }
        let output = self.derive_output_columns(handle);
        outer
            .conjoin(handle.child_relational(1).constraint())
            .with_predicate(&handle.scalar_child(2))
            .restrict(&output)
    }

    fn derive_max_card(&self, handle: &ExpressionHandle) -> MaxCard {
        let outer = handle.child_relational(0).max_card();
        if self.is_inner() {
            outer * handle.child_relational(1).max_card()
        } else {
            outer
        }
    }

    fn derive_stats(
        &self,
        handle: &ExpressionHandle,
        ctx: &OptimizerContext,
    ) -> OptResult<Statistics> {
        let estimator = ctx.stats_estimator();
        let outer = handle.child_stats(0, ctx)?;
        let inner = handle.child_stats(1, ctx)?;
        let joined = estimator.apply_filter(
            &estimator.cross_product(&outer, &inner),
            &handle.scalar_child(2),
        );
        if self.is_inner() {
            Ok(joined)
        } else {
            Ok(outer.with_rows(joined.rows().min(outer.rows())))
        }
    }
}

impl PhysicalOperatorTrait for Join {
    /// Either both sides are hashed on the equi join columns, or the inner side is replicated.
    fn derive_properties(&self, context: DerivePropContext) -> OptResult<Vec<DerivePropResult>> {
        let handle = context.expr_handle;
        let (left_keys, right_keys) = equi_join_columns(
            &handle.scalar_child(2),
            handle.child_relational(0).output_columns(),
            handle.child_relational(1).output_columns(),
        );

        let mut results = vec![];
        if !left_keys.is_empty() {
            let hashed = |keys: Vec<ColRef>| {
                PhysicalPropertySet::default().with_distribution(DistributionSpec::Hashed(keys))
            };
            results.push(DerivePropResult {
                output_prop: hashed(left_keys.clone()),
                input_required_props: vec![hashed(left_keys), hashed(right_keys)],
            });
        }
        results.push(DerivePropResult {
            output_prop: PhysicalPropertySet::default(),
            input_required_props: vec![
                PhysicalPropertySet::default(),
                PhysicalPropertySet::default().with_distribution(DistributionSpec::Replicated),
            ],
        });
        Ok(results)
    }
}

impl RemapColumns for Join {
    fn remap_columns(&self, _map: &ColRefMap, _must_exist: bool) -> OptResult<Self> {
        Ok(self.clone())
    }
}

impl DisplayFields for Join {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("join_type", &self.join_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::LogicalOperator::LogicalJoin;
    use crate::test_utils::{employee_context, get_expr, employee_table};

    #[test]
    fn test_inner_join_properties() {
        let ctx = employee_context();
        let (left, left_cols) = get_expr(&ctx, employee_table(&ctx));
        let (right, right_cols) = get_expr(&ctx, employee_table(&ctx));
        let predicate = scalar::column_eq(left_cols[2].clone(), right_cols[0].clone());

        let join = Expression::new(LogicalJoin(Join::inner()), vec![left, right, predicate]).unwrap();
        let props = join.derive_relational();
        assert_eq!(6, props.output_columns().len());
        assert_eq!(2, props.join_depth());
        assert!(props.outer_references().is_empty());
        assert_eq!(1, props.key_collection().len());
        assert_eq!(2, props.key_collection().keys()[0].len());
        assert_eq!(1, props.constraint().equivalence_classes().len());
    }

    #[test]
    fn test_semi_join_outputs_outer_side() {
        let ctx = employee_context();
        let (left, left_cols) = get_expr(&ctx, employee_table(&ctx));
        let (right, right_cols) = get_expr(&ctx, employee_table(&ctx));
        let predicate = scalar::column_eq(left_cols[0].clone(), right_cols[2].clone());

        let join =
            Expression::new(LogicalJoin(Join::left_semi()), vec![left, right, predicate]).unwrap();
        let props = join.derive_relational();
        assert_eq!(3, props.output_columns().len());
        assert!(props.output_columns().contains(&left_cols[0]));
        assert!(!props.output_columns().contains(&right_cols[2]));
    }

    #[test]
    #[should_panic(expected = "Unsupported join type")]
    fn test_full_join_rejected() {
        Join::new(JoinType::Full);
    }
}
