use std::collections::HashMap;
use std::ops::Bound;
use std::sync::Arc;

use datafusion_common::ScalarValue;
use datafusion_expr::Operator as CmpOp;
use log::trace;

use crate::column::{ColRef, ColRefSet};
use crate::error::OptResult;
use crate::expression::Expression;
use crate::metadata::{MdAccessor, RelationMd, TableDescriptor};
use crate::operator::scalar;
use crate::operator::{BoolOpKind, Operator, ScalarOperator};
use crate::optimizer::OptimizerConfig;
use crate::properties::{Constraint, Interval, Range};
use crate::stats::{Bucket, ColumnStatistics, Statistics, StatsEstimator};

/// Selectivity based estimator reading row counts and distinct counts from metadata.
///
/// Predicates on the first partition key of a table are estimated from the fraction of leaf
/// partitions they overlap.
#[derive(Debug)]
pub struct SimpleStatsEstimator {
    md_accessor: Arc<dyn MdAccessor>,
    default_filter_selectivity: f64,
    default_range_selectivity: f64,
    default_row_count: f64,
}

impl SimpleStatsEstimator {
    pub fn new(md_accessor: Arc<dyn MdAccessor>, config: &OptimizerConfig) -> Self {
        Self {
            md_accessor,
            default_filter_selectivity: config.default_filter_selectivity,
            default_range_selectivity: config.default_range_selectivity,
            default_row_count: config.default_row_count,
        }
    }

    fn relation_rows(&self, table: &TableDescriptor, relation: &RelationMd) -> f64 {
        if let Some(rows) = relation.rows {
            return rows;
        }
        let partition_rows: Option<f64> = table
            .leaf_partitions()
            .iter()
            .map(|id| relation.partition(*id).and_then(|p| p.rows))
            .sum();
        match partition_rows {
            Some(rows) if table.is_partitioned() => rows,
            _ => self.default_row_count,
        }
    }

    fn partition_buckets(&self, table: &TableDescriptor, relation: &RelationMd) -> Vec<Bucket> {
        let partitions = table
            .leaf_partitions()
            .iter()
            .filter_map(|id| relation.partition(*id))
            .collect::<Vec<_>>();
        let known_rows: Option<f64> = partitions.iter().map(|p| p.rows).sum();
        partitions
            .iter()
            .map(|p| {
                let frequency = match (known_rows, p.rows) {
                    (Some(total), Some(rows)) if total > 0.0 => rows / total,
                    _ => 1.0 / partitions.len() as f64,
                };
                Bucket {
                    lower: p.lower.clone(),
                    upper: p.upper.clone(),
                    frequency,
                }
            })
            .collect()
    }

    fn selectivity(&self, input: &Statistics, predicate: &Expression) -> f64 {
        if let Some(selectivity) = self.bucket_selectivity(input, predicate) {
            return selectivity;
        }

        let op = match predicate.operator() {
            Operator::Scalar(op) => op,
            _ => return self.default_filter_selectivity,
        };
        match op {
            ScalarOperator::ScalarConst(c) => match c.value() {
                ScalarValue::Boolean(Some(true)) => 1.0,
                _ => 0.0,
            },
            ScalarOperator::ScalarBoolOp(bool_op) => match bool_op.kind() {
                BoolOpKind::And => predicate
                    .children()
                    .iter()
                    .map(|c| self.selectivity(input, c))
                    .product(),
                BoolOpKind::Or => predicate
                    .children()
                    .iter()
                    .map(|c| self.selectivity(input, c))
                    .sum::<f64>()
                    .min(1.0),
                BoolOpKind::Not => 1.0 - self.selectivity(input, &predicate[0]),
            },
            ScalarOperator::ScalarIsNull(_) => scalar::column_of(&predicate[0])
                .and_then(|col| input.column(col))
                .map(|stats| stats.null_fraction())
                .unwrap_or(self.default_filter_selectivity),
            ScalarOperator::ScalarCmp(cmp) => self.cmp_selectivity(input, cmp.op(), predicate),
            _ => self.default_filter_selectivity,
        }
    }

    fn cmp_selectivity(&self, input: &Statistics, op: CmpOp, predicate: &Expression) -> f64 {
        let ndv = |col: &ColRef| input.column(col).and_then(|s| s.ndv()).filter(|n| *n >= 1.0);

        if let Some((left, right)) = scalar::column_equality(predicate) {
            return match (ndv(&left), ndv(&right)) {
                (Some(l), Some(r)) => 1.0 / l.max(r),
                (Some(n), None) | (None, Some(n)) => 1.0 / n,
                (None, None) => self.default_filter_selectivity,
            };
        }

        let col = scalar::column_of(&predicate[0]).or_else(|| scalar::column_of(&predicate[1]));
        match (op, col.and_then(ndv)) {
            (CmpOp::Eq, Some(n)) => 1.0 / n,
            (CmpOp::NotEq, Some(n)) => 1.0 - 1.0 / n,
            (CmpOp::Eq, None) => self.default_filter_selectivity,
            (CmpOp::NotEq, None) => 1.0 - self.default_filter_selectivity,
            (CmpOp::Lt | CmpOp::LtEq | CmpOp::Gt | CmpOp::GtEq, _) => {
                self.default_range_selectivity
            }
            _ => self.default_filter_selectivity,
        }
    }

    /// Fraction of bucketed rows an interval predicate keeps, if the column has buckets.
    fn bucket_selectivity(&self, input: &Statistics, predicate: &Expression) -> Option<f64> {
        let constraint = Constraint::from_predicate(predicate)?;
        let interval = constraint.as_interval()?;
        let buckets = input.column(interval.column())?.buckets();
        if buckets.is_empty() {
            return None;
        }
        Some(bucket_fraction(interval, buckets))
    }
}

fn bucket_fraction(interval: &Interval, buckets: &[Bucket]) -> f64 {
    let bound = |v: &Option<ScalarValue>, included: bool| match v {
        Some(v) if included => Bound::Included(v.clone()),
        Some(v) => Bound::Excluded(v.clone()),
        None => Bound::Unbounded,
    };
    buckets
        .iter()
        .filter(|b| interval.overlaps(&Range::new(bound(&b.lower, true), bound(&b.upper, false))))
        .map(|b| b.frequency)
        .sum::<f64>()
        .min(1.0)
}

impl StatsEstimator for SimpleStatsEstimator {
    fn estimate_base_table(
        &self,
        table: &TableDescriptor,
        output: &[ColRef],
    ) -> OptResult<Statistics> {
        let relation = self.md_accessor.retrieve_relation(table.mdid())?;
        let rows = self.relation_rows(table, &relation);
        let part_key = table
            .partition_columns()
            .first()
            .map(|pos| table.column_at(*pos).attno);

        let mut column_stats = HashMap::with_capacity(output.len());
        for col in output {
            let mut stats = ColumnStatistics::new(None, 0.0, col.width() as f64);
            if let Some(attno) = col.attno() {
                if let Some(md) = self.md_accessor.retrieve_column_stats(table.mdid(), attno)? {
                    stats = ColumnStatistics::new(
                        Some(md.ndv.min(rows)),
                        md.null_fraction,
                        col.width() as f64,
                    );
                }
                if part_key == Some(attno) {
                    stats = stats.with_buckets(self.partition_buckets(table, &relation));
                }
            }
            column_stats.insert(col.id(), stats);
        }

        trace!("Estimated {} rows for table {}", rows, table.name());
        Ok(Statistics::new(rows, column_stats))
    }

    fn apply_filter(&self, input: &Statistics, predicate: &Expression) -> Statistics {
        let selectivity = self.selectivity(input, predicate).clamp(0.0, 1.0);
        input.with_rows(input.rows() * selectivity)
    }

    fn apply_limit(&self, input: &Statistics, count: u64) -> Statistics {
        input.with_rows(input.rows().min(count as f64))
    }

    fn cross_product(&self, left: &Statistics, right: &Statistics) -> Statistics {
        let column_stats = left
            .columns()
            .chain(right.columns())
            .map(|(id, stats)| (*id, stats.clone()))
            .collect();
        Statistics::new(left.rows() * right.rows(), column_stats)
    }

    fn apply_group_by(&self, input: &Statistics, grouping: &ColRefSet) -> Statistics {
        if grouping.is_empty() {
            return input.project(grouping).with_rows(1.0);
        }
        let groups = grouping
            .iter()
            .map(|col| {
                input
                    .column(col)
                    .and_then(|s| s.ndv())
                    .unwrap_or(input.rows())
            })
            .product::<f64>();
        input.project(grouping).with_rows(groups.min(input.rows()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{employee_context, employee_table, get_expr};

    #[test]
    fn test_equality_uses_ndv() {
        let ctx = employee_context();
        let (get, cols) = get_expr(&ctx, employee_table(&ctx));
        let stats = get.derive_stats(&ctx).unwrap();
        let predicate = scalar::cmp(
            CmpOp::Eq,
            scalar::ident(cols[2].clone()),
            scalar::constant(ScalarValue::Int32(Some(1))),
        );

        let filtered = ctx.stats_estimator().apply_filter(&stats, &predicate);
        let ndv = stats.column(&cols[2]).unwrap().ndv().unwrap();
        assert!((filtered.rows() - stats.rows() / ndv).abs() < 1e-6);
    }

    #[test]
    fn test_filter_never_grows() {
        let ctx = employee_context();
        let (get, cols) = get_expr(&ctx, employee_table(&ctx));
        let stats = get.derive_stats(&ctx).unwrap();
        let always = scalar::disjunction(vec![
            scalar::is_null(scalar::ident(cols[1].clone())),
            scalar::not(scalar::is_null(scalar::ident(cols[1].clone()))),
            scalar::column_eq(cols[0].clone(), cols[2].clone()),
        ]);

        let filtered = ctx.stats_estimator().apply_filter(&stats, &always);
        assert!(filtered.rows() <= stats.rows());
    }

    #[test]
    fn test_limit_and_group_by() {
        let ctx = employee_context();
        let (get, cols) = get_expr(&ctx, employee_table(&ctx));
        let stats = get.derive_stats(&ctx).unwrap();
        let estimator = ctx.stats_estimator();

        assert_eq!(5.0, estimator.apply_limit(&stats, 5).rows());
        let grouped = estimator.apply_group_by(&stats, &ColRefSet::from_iter(vec![cols[2].clone()]));
        assert_eq!(stats.column(&cols[2]).unwrap().ndv(), Some(grouped.rows()));
        assert_eq!(1.0, estimator.apply_group_by(&stats, &ColRefSet::new()).rows());
    }
}
