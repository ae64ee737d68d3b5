//! Column level value restrictions.
//!
//! A [`Constraint`] is a boolean combination of per column [`Interval`]s. Intervals hold
//! normalized, non overlapping ranges ordered by lower bound. [`PropConstraint`] pairs a
//! constraint with the column equivalence classes known to hold on an expression's output.
use std::cmp::Ordering;
use std::ops::Bound;
use std::sync::Arc;

use datafusion_common::ScalarValue;
use datafusion_expr::Operator as CmpOp;
use itertools::Itertools;

use crate::column::{remap_column, ColRef, ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::expression::Expression;
use crate::operator::scalar::{self, ScalarOperator};
use crate::operator::{BoolOpKind, Operator};

fn cmp_values(a: &ScalarValue, b: &ScalarValue) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

fn max_lower(a: &Bound<ScalarValue>, b: &Bound<ScalarValue>) -> Bound<ScalarValue> {
    use Bound::*;
    match (a, b) {
        (Unbounded, other) | (other, Unbounded) => other.clone(),
        (Included(x), Included(y)) | (Excluded(x), Excluded(y)) => {
            if cmp_values(x, y) == Ordering::Less {
                b.clone()
            } else {
                a.clone()
            }
        }
        (Included(x), Excluded(y)) | (Excluded(y), Included(x)) => match cmp_values(x, y) {
            Ordering::Greater => Included(x.clone()),
            _ => Excluded(y.clone()),
        },
    }
}

fn min_upper(a: &Bound<ScalarValue>, b: &Bound<ScalarValue>) -> Bound<ScalarValue> {
    use Bound::*;
    match (a, b) {
        (Unbounded, other) | (other, Unbounded) => other.clone(),
        (Included(x), Included(y)) | (Excluded(x), Excluded(y)) => {
            if cmp_values(x, y) == Ordering::Greater {
                b.clone()
            } else {
                a.clone()
            }
        }
        (Included(x), Excluded(y)) | (Excluded(y), Included(x)) => match cmp_values(x, y) {
            Ordering::Less => Included(x.clone()),
            _ => Excluded(y.clone()),
        },
    }
}

fn max_upper(a: &Bound<ScalarValue>, b: &Bound<ScalarValue>) -> Bound<ScalarValue> {
    use Bound::*;
    match (a, b) {
        (Unbounded, _) | (_, Unbounded) => Unbounded,
        (Included(x), Included(y)) | (Excluded(x), Excluded(y)) => {
            if cmp_values(x, y) == Ordering::Less {
                b.clone()
            } else {
                a.clone()
            }
        }
        (Included(x), Excluded(y)) | (Excluded(y), Included(x)) => match cmp_values(x, y) {
            Ordering::Less => Excluded(y.clone()),
            _ => Included(x.clone()),
        },
    }
}

fn cmp_lower(a: &Bound<ScalarValue>, b: &Bound<ScalarValue>) -> Ordering {
    use Bound::*;
    match (a, b) {
        (Unbounded, Unbounded) => Ordering::Equal,
        (Unbounded, _) => Ordering::Less,
        (_, Unbounded) => Ordering::Greater,
        (Included(x), Included(y)) | (Excluded(x), Excluded(y)) => cmp_values(x, y),
        (Included(x), Excluded(y)) => cmp_values(x, y).then(Ordering::Less),
        (Excluded(x), Included(y)) => cmp_values(x, y).then(Ordering::Greater),
    }
}

/// One contiguous range of values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    lower: Bound<ScalarValue>,
    upper: Bound<ScalarValue>,
}

impl Range {
    pub fn new(lower: Bound<ScalarValue>, upper: Bound<ScalarValue>) -> Self {
        Self { lower, upper }
    }

    pub fn point(value: ScalarValue) -> Self {
        Self::new(Bound::Included(value.clone()), Bound::Included(value))
    }

    pub fn unbounded() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    pub fn lower(&self) -> &Bound<ScalarValue> {
        &self.lower
    }

    pub fn upper(&self) -> &Bound<ScalarValue> {
        &self.upper
    }

    pub fn is_point(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Included(l), Bound::Included(u)) => cmp_values(l, u) == Ordering::Equal,
            _ => false,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!((&self.lower, &self.upper), (Bound::Unbounded, Bound::Unbounded))
    }

    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Included(l), Bound::Included(u)) => cmp_values(l, u) == Ordering::Greater,
            (Bound::Included(l), Bound::Excluded(u))
            | (Bound::Excluded(l), Bound::Included(u))
            | (Bound::Excluded(l), Bound::Excluded(u)) => cmp_values(l, u) != Ordering::Less,
        }
    }

    /// `None` when the ranges don't overlap.
    pub fn intersect(&self, other: &Range) -> Option<Range> {
        let range = Range::new(
            max_lower(&self.lower, &other.lower),
            min_upper(&self.upper, &other.upper),
        );
        if range.is_empty() {
            None
        } else {
            Some(range)
        }
    }

    /// Whether `next`, starting no earlier than `self`, overlaps or touches it.
    fn joins(&self, next: &Range) -> bool {
        match (&self.upper, &next.lower) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
            (Bound::Included(u), Bound::Included(l)) => cmp_values(u, l) != Ordering::Less,
            (Bound::Included(u), Bound::Excluded(l)) | (Bound::Excluded(u), Bound::Included(l)) => {
                cmp_values(u, l) != Ordering::Less
            }
            (Bound::Excluded(u), Bound::Excluded(l)) => cmp_values(u, l) == Ordering::Greater,
        }
    }
}

fn normalize(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.retain(|r| !r.is_empty());
    ranges.sort_by(|a, b| cmp_lower(&a.lower, &b.lower));

    let mut result: Vec<Range> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match result.last_mut() {
            Some(last) if last.joins(&range) => {
                last.upper = max_upper(&last.upper, &range.upper);
            }
            _ => result.push(range),
        }
    }
    result
}

/// Values a single column may take.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    column: ColRef,
    ranges: Vec<Range>,
    include_null: bool,
}

impl Interval {
    pub fn new(column: ColRef, ranges: Vec<Range>, include_null: bool) -> Self {
        Self {
            column,
            ranges: normalize(ranges),
            include_null,
        }
    }

    pub fn not_null(column: ColRef) -> Self {
        Self::new(column, vec![Range::unbounded()], false)
    }

    pub fn null_only(column: ColRef) -> Self {
        Self::new(column, vec![], true)
    }

    /// Interval of `column op value`. `None` when the comparison isn't a range restriction.
    pub fn from_cmp(column: ColRef, op: CmpOp, value: ScalarValue) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        let ranges = match op {
            CmpOp::Eq => vec![Range::point(value)],
            CmpOp::NotEq => vec![
                Range::new(Bound::Unbounded, Bound::Excluded(value.clone())),
                Range::new(Bound::Excluded(value), Bound::Unbounded),
            ],
            CmpOp::Lt => vec![Range::new(Bound::Unbounded, Bound::Excluded(value))],
            CmpOp::LtEq => vec![Range::new(Bound::Unbounded, Bound::Included(value))],
            CmpOp::Gt => vec![Range::new(Bound::Excluded(value), Bound::Unbounded)],
            CmpOp::GtEq => vec![Range::new(Bound::Included(value), Bound::Unbounded)],
            _ => return None,
        };
        Some(Self::new(column, ranges, false))
    }

    pub fn column(&self) -> &ColRef {
        &self.column
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn include_null(&self) -> bool {
        self.include_null
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_unbounded(&self) -> bool {
        self.include_null && self.ranges.len() == 1 && self.ranges[0].is_unbounded()
    }

    pub fn is_empty(&self) -> bool {
        !self.include_null && self.ranges.is_empty()
    }

    pub fn intersect(&self, other: &Interval) -> Interval {
        assert_eq!(self.column, other.column, "Intervals on different columns");
        let ranges = self
            .ranges
            .iter()
            .cartesian_product(other.ranges.iter())
            .filter_map(|(a, b)| a.intersect(b))
            .collect();
        Interval::new(
            self.column.clone(),
            ranges,
            self.include_null && other.include_null,
        )
    }

    pub fn union(&self, other: &Interval) -> Interval {
        assert_eq!(self.column, other.column, "Intervals on different columns");
        let ranges = self.ranges.iter().chain(other.ranges.iter()).cloned().collect();
        Interval::new(
            self.column.clone(),
            ranges,
            self.include_null || other.include_null,
        )
    }

    pub fn remap(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Interval> {
        Ok(Interval {
            column: remap_column(&self.column, map, must_exist)?,
            ranges: self.ranges.clone(),
            include_null: self.include_null,
        })
    }

    /// Whether any value of `range` is in this interval.
    pub fn overlaps(&self, range: &Range) -> bool {
        self.ranges.iter().any(|r| r.intersect(range).is_some())
    }

    pub fn to_predicate(&self) -> Arc<Expression> {
        let ident = || scalar::ident(self.column.clone());
        let mut disjuncts = Vec::with_capacity(self.ranges.len() + 1);
        for range in &self.ranges {
            if range.is_point() {
                if let Bound::Included(v) = &range.lower {
                    disjuncts.push(scalar::cmp(CmpOp::Eq, ident(), scalar::constant(v.clone())));
                }
                continue;
            }
            let mut conjuncts = vec![];
            match &range.lower {
                Bound::Included(v) => {
                    conjuncts.push(scalar::cmp(CmpOp::GtEq, ident(), scalar::constant(v.clone())))
                }
                Bound::Excluded(v) => {
                    conjuncts.push(scalar::cmp(CmpOp::Gt, ident(), scalar::constant(v.clone())))
                }
                Bound::Unbounded => {}
            }
            match &range.upper {
                Bound::Included(v) => {
                    conjuncts.push(scalar::cmp(CmpOp::LtEq, ident(), scalar::constant(v.clone())))
                }
                Bound::Excluded(v) => {
                    conjuncts.push(scalar::cmp(CmpOp::Lt, ident(), scalar::constant(v.clone())))
                }
                Bound::Unbounded => {}
            }
            if conjuncts.is_empty() {
                conjuncts.push(scalar::not(scalar::is_null(ident())));
            }
            disjuncts.push(scalar::conjunction(conjuncts));
        }
        if self.include_null {
            disjuncts.push(scalar::is_null(ident()));
        }
        scalar::disjunction(disjuncts)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constraint {
    Interval(Interval),
    Conjunction(Vec<Constraint>),
    Disjunction(Vec<Constraint>),
}

impl Constraint {
    /// Flattens nested conjunctions and intersects intervals on the same column.
    pub fn conjunction(constraints: Vec<Constraint>) -> Option<Constraint> {
        let mut intervals: Vec<Interval> = vec![];
        let mut others = vec![];
        let mut pending = constraints;
        while let Some(constraint) = pending.pop() {
            match constraint {
                Constraint::Interval(interval) => {
                    match intervals.iter_mut().find(|i| i.column == interval.column) {
                        Some(existing) => *existing = existing.intersect(&interval),
                        None => intervals.push(interval),
                    }
                }
                Constraint::Conjunction(children) => pending.extend(children),
                disjunction => others.push(disjunction),
            }
        }
        intervals.sort_by(|a, b| a.column.cmp(&b.column));

        let mut children: Vec<Constraint> =
            intervals.into_iter().map(Constraint::Interval).collect();
        children.extend(others);
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(Constraint::Conjunction(children)),
        }
    }

    /// Flattens nested disjunctions. Disjuncts all on one column collapse to one interval.
    pub fn disjunction(constraints: Vec<Constraint>) -> Option<Constraint> {
        let mut children = vec![];
        let mut pending = constraints;
        while let Some(constraint) = pending.pop() {
            match constraint {
                Constraint::Disjunction(nested) => pending.extend(nested),
                other => children.push(other),
            }
        }
        children.reverse();

        let single_column = children.iter().all(|c| matches!(c, Constraint::Interval(_)))
            && children
                .iter()
                .filter_map(|c| c.as_interval())
                .map(|i| i.column.id())
                .all_equal();
        if single_column {
            return children
                .iter()
                .filter_map(|c| c.as_interval())
                .cloned()
                .reduce(|a, b| a.union(&b))
                .map(Constraint::Interval);
        }
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(Constraint::Disjunction(children)),
        }
    }

    pub fn as_interval(&self) -> Option<&Interval> {
        match self {
            Constraint::Interval(i) => Some(i),
            _ => None,
        }
    }

    /// Constraint implied by a scalar predicate, `None` when nothing can be inferred.
    pub fn from_predicate(predicate: &Expression) -> Option<Constraint> {
        let op = match predicate.operator() {
            Operator::Scalar(op) => op,
            _ => return None,
        };
        match op {
            ScalarOperator::ScalarCmp(cmp) => {
                let (left, right) = (&predicate[0], &predicate[1]);
                if let (Some(col), Some(value)) =
                    (scalar::column_of(left), scalar::constant_of(right))
                {
                    return Interval::from_cmp(col.clone(), cmp.op(), value.clone())
                        .map(Constraint::Interval);
                }
                if let (Some(value), Some(col)) =
                    (scalar::constant_of(left), scalar::column_of(right))
                {
                    let op = scalar::commute_op(cmp.op())?;
                    return Interval::from_cmp(col.clone(), op, value.clone())
                        .map(Constraint::Interval);
                }
                None
            }
            ScalarOperator::ScalarIsNull(_) => scalar::column_of(&predicate[0])
                .map(|col| Constraint::Interval(Interval::null_only(col.clone()))),
            ScalarOperator::ScalarBoolOp(bool_op) => match bool_op.kind() {
                BoolOpKind::And => Constraint::conjunction(
                    predicate
                        .children()
                        .iter()
                        .filter_map(|c| Constraint::from_predicate(c))
                        .collect(),
                ),
                BoolOpKind::Or => {
                    let children: Option<Vec<Constraint>> = predicate
                        .children()
                        .iter()
                        .map(|c| Constraint::from_predicate(c))
                        .collect();
                    Constraint::disjunction(children?)
                }
                BoolOpKind::Not => {
                    let child = &predicate[0];
                    match child.operator() {
                        Operator::Scalar(ScalarOperator::ScalarIsNull(_)) => {
                            scalar::column_of(&child[0])
                                .map(|col| Constraint::Interval(Interval::not_null(col.clone())))
                        }
                        _ => None,
                    }
                }
            },
            _ => None,
        }
    }

    pub fn columns(&self) -> ColRefSet {
        match self {
            Constraint::Interval(i) => ColRefSet::from_iter(std::iter::once(i.column.clone())),
            Constraint::Conjunction(children) | Constraint::Disjunction(children) => {
                let mut cols = ColRefSet::new();
                for child in children {
                    cols.include_all(child.columns().iter());
                }
                cols
            }
        }
    }

    /// Interval implied on `col`, `None` when the constraint doesn't restrict it.
    pub fn interval_on(&self, col: &ColRef) -> Option<Interval> {
        match self {
            Constraint::Interval(i) if &i.column == col => Some(i.clone()),
            Constraint::Interval(_) => None,
            Constraint::Conjunction(children) => children
                .iter()
                .filter_map(|c| c.interval_on(col))
                .reduce(|a, b| a.intersect(&b)),
            Constraint::Disjunction(children) => {
                let intervals: Option<Vec<Interval>> =
                    children.iter().map(|c| c.interval_on(col)).collect();
                intervals?.into_iter().reduce(|a, b| a.union(&b))
            }
        }
    }

    /// Drops the parts referencing columns outside `cols`.
    pub fn restrict(&self, cols: &ColRefSet) -> Option<Constraint> {
        match self {
            Constraint::Interval(i) if cols.contains(&i.column) => Some(self.clone()),
            Constraint::Interval(_) => None,
            Constraint::Conjunction(children) => Constraint::conjunction(
                children.iter().filter_map(|c| c.restrict(cols)).collect(),
            ),
            Constraint::Disjunction(_) if self.columns().is_subset(cols) => Some(self.clone()),
            Constraint::Disjunction(_) => None,
        }
    }

    pub fn remap(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Constraint> {
        Ok(match self {
            Constraint::Interval(i) => Constraint::Interval(i.remap(map, must_exist)?),
            Constraint::Conjunction(children) => Constraint::Conjunction(
                children
                    .iter()
                    .map(|c| c.remap(map, must_exist))
                    .try_collect()?,
            ),
            Constraint::Disjunction(children) => Constraint::Disjunction(
                children
                    .iter()
                    .map(|c| c.remap(map, must_exist))
                    .try_collect()?,
            ),
        })
    }

    pub fn to_predicate(&self) -> Arc<Expression> {
        match self {
            Constraint::Interval(i) => i.to_predicate(),
            Constraint::Conjunction(children) => {
                scalar::conjunction(children.iter().map(Constraint::to_predicate).collect())
            }
            Constraint::Disjunction(children) => {
                scalar::disjunction(children.iter().map(Constraint::to_predicate).collect())
            }
        }
    }
}

/// Constraint property of a relational expression.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PropConstraint {
    equivalence_classes: Vec<ColRefSet>,
    constraint: Option<Constraint>,
}

fn merge_classes(classes: Vec<ColRefSet>) -> Vec<ColRefSet> {
    let mut result: Vec<ColRefSet> = vec![];
    for class in classes {
        let (overlapping, mut rest): (Vec<ColRefSet>, Vec<ColRefSet>) =
            result.into_iter().partition(|c| !c.is_disjoint(&class));
        let merged = overlapping.iter().fold(class, |acc, c| acc.union(c));
        rest.push(merged);
        result = rest;
    }
    result.retain(|c| c.len() > 1);
    result.sort_by(|a, b| a.ids().cmp(&b.ids()));
    result
}

impl PropConstraint {
    pub fn new(equivalence_classes: Vec<ColRefSet>, constraint: Option<Constraint>) -> Self {
        Self {
            equivalence_classes: merge_classes(equivalence_classes),
            constraint,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn equivalence_classes(&self) -> &[ColRefSet] {
        &self.equivalence_classes
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    /// Columns known equal to `col`, `col` included.
    pub fn equivalent_columns(&self, col: &ColRef) -> ColRefSet {
        self.equivalence_classes
            .iter()
            .find(|c| c.contains(col))
            .cloned()
            .unwrap_or_else(|| ColRefSet::from_iter(std::iter::once(col.clone())))
    }

    pub fn interval_on(&self, col: &ColRef) -> Option<Interval> {
        self.constraint.as_ref().and_then(|c| c.interval_on(col))
    }

    pub fn restrict(&self, output: &ColRefSet) -> PropConstraint {
        PropConstraint::new(
            self.equivalence_classes
                .iter()
                .map(|c| c.intersection(output))
                .collect(),
            self.constraint.as_ref().and_then(|c| c.restrict(output)),
        )
    }

    pub fn conjoin(&self, other: &PropConstraint) -> PropConstraint {
        let constraint = Constraint::conjunction(
            self.constraint
                .iter()
                .chain(other.constraint.iter())
                .cloned()
                .collect(),
        );
        PropConstraint::new(
            self.equivalence_classes
                .iter()
                .chain(other.equivalence_classes.iter())
                .cloned()
                .collect(),
            constraint,
        )
    }

    /// Adds what a filter predicate implies: its interval constraint and the equivalences of
    /// its column equality conjuncts.
    pub fn with_predicate(&self, predicate: &Arc<Expression>) -> PropConstraint {
        let classes = scalar::split_conjuncts(predicate)
            .iter()
            .filter_map(|c| scalar::column_equality(c))
            .map(|(l, r)| ColRefSet::from_iter(vec![l, r]))
            .collect();
        self.conjoin(&PropConstraint::new(
            classes,
            Constraint::from_predicate(predicate),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnFactory;
    use crate::metadata::ColumnType;
    use arrow_schema::DataType;

    fn int(v: i32) -> ScalarValue {
        ScalarValue::Int32(Some(v))
    }

    fn column(factory: &ColumnFactory, name: &str) -> ColRef {
        factory.create_computed(name, ColumnType::new(DataType::Int32))
    }

    #[test]
    fn test_range_touching_bounds() {
        let a = Range::new(Bound::Included(int(0)), Bound::Excluded(int(10)));
        let b = Range::new(Bound::Included(int(10)), Bound::Excluded(int(20)));
        assert!(a.intersect(&b).is_none());

        let c = Range::new(Bound::Included(int(0)), Bound::Excluded(int(20)));
        assert_eq!(Some(b.clone()), b.intersect(&c));

        let interval = Interval::new(
            ColumnFactory::new().create_computed("p", ColumnType::new(DataType::Int32)),
            vec![b, a],
            false,
        );
        assert_eq!(1, interval.range_count());
        assert_eq!(&Bound::Included(int(0)), interval.ranges()[0].lower());
        assert_eq!(&Bound::Excluded(int(20)), interval.ranges()[0].upper());
    }

    #[test]
    fn test_not_eq_has_two_ranges() {
        let factory = ColumnFactory::new();
        let interval = Interval::from_cmp(column(&factory, "a"), CmpOp::NotEq, int(5)).unwrap();
        assert_eq!(2, interval.range_count());
        assert!(!interval.include_null());
        assert!(Interval::from_cmp(column(&factory, "a"), CmpOp::Plus, int(5)).is_none());
    }

    #[test]
    fn test_constraint_from_predicate() {
        let factory = ColumnFactory::new();
        let a = column(&factory, "a");
        let b = column(&factory, "b");

        // a >= 1 AND a < 10 AND 3 < b
        let predicate = scalar::conjunction(vec![
            scalar::cmp(CmpOp::GtEq, scalar::ident(a.clone()), scalar::constant(int(1))),
            scalar::cmp(CmpOp::Lt, scalar::ident(a.clone()), scalar::constant(int(10))),
            scalar::cmp(CmpOp::Lt, scalar::constant(int(3)), scalar::ident(b.clone())),
        ]);
        let constraint = Constraint::from_predicate(&predicate).unwrap();

        let on_a = constraint.interval_on(&a).unwrap();
        assert_eq!(
            vec![Range::new(Bound::Included(int(1)), Bound::Excluded(int(10)))],
            on_a.ranges()
        );
        let on_b = constraint.interval_on(&b).unwrap();
        assert_eq!(&Bound::Excluded(int(3)), on_b.ranges()[0].lower());

        let restricted = constraint
            .restrict(&ColRefSet::from_iter(std::iter::once(a.clone())))
            .unwrap();
        assert_eq!(ColRefSet::from_iter(std::iter::once(a)), restricted.columns());
    }

    #[test]
    fn test_disjunction_on_one_column_collapses() {
        let factory = ColumnFactory::new();
        let a = column(&factory, "a");
        let predicate = scalar::disjunction(vec![
            scalar::cmp(CmpOp::Eq, scalar::ident(a.clone()), scalar::constant(int(1))),
            scalar::cmp(CmpOp::Eq, scalar::ident(a.clone()), scalar::constant(int(7))),
            scalar::is_null(scalar::ident(a.clone())),
        ]);
        let constraint = Constraint::from_predicate(&predicate).unwrap();
        let interval = constraint.as_interval().unwrap();
        assert_eq!(2, interval.range_count());
        assert!(interval.include_null());
    }

    #[test]
    fn test_interval_predicate_round_trip() {
        let factory = ColumnFactory::new();
        let a = column(&factory, "a");
        let interval = Interval::new(
            a.clone(),
            vec![
                Range::new(Bound::Included(int(0)), Bound::Excluded(int(10))),
                Range::point(int(42)),
            ],
            false,
        );
        let predicate = interval.to_predicate();
        let derived = Constraint::from_predicate(&predicate).unwrap();
        assert_eq!(Some(&interval), derived.as_interval());
    }

    #[test]
    fn test_equivalence_classes_merge() {
        let factory = ColumnFactory::new();
        let cols: Vec<ColRef> = ["a", "b", "c", "d"].iter().map(|n| column(&factory, n)).collect();
        let prop = PropConstraint::new(
            vec![
                ColRefSet::from_iter(&cols[0..2]),
                ColRefSet::from_iter(&cols[1..3]),
                ColRefSet::from_iter(&cols[3..4]),
            ],
            None,
        );
        assert_eq!(1, prop.equivalence_classes().len());
        assert_eq!(3, prop.equivalent_columns(&cols[0]).len());
        assert_eq!(1, prop.equivalent_columns(&cols[3]).len());

        let restricted = prop.restrict(&ColRefSet::from_iter(&cols[1..2]));
        assert!(restricted.equivalence_classes().is_empty());
    }
}
