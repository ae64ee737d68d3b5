//! Cardinality estimation.
mod simple;
pub use simple::*;

use std::collections::HashMap;
use std::fmt::Debug;

use datafusion_common::ScalarValue;

use crate::column::{ColId, ColRef, ColRefSet};
use crate::error::OptResult;
use crate::expression::Expression;
use crate::metadata::TableDescriptor;

/// Statistics of operator.
#[derive(Clone, PartialEq, Debug)]
pub struct Statistics {
    /// Total number of row count.
    ///
    /// This maybe an estimated value.
    row_count: f64,
    /// Statistics of each column.
    column_stats: HashMap<ColId, ColumnStatistics>,
}

/// Statistics of one column.
#[derive(Clone, PartialEq, Debug)]
pub struct ColumnStatistics {
    /// Number of distinct values, `None` when unknown.
    ndv: Option<f64>,
    null_fraction: f64,
    width: f64,
    /// Value ranges with the fraction of rows each holds, e.g. one per leaf partition.
    buckets: Vec<Bucket>,
}

/// Rows in `[lower, upper)`, `None` meaning unbounded.
#[derive(Clone, PartialEq, Debug)]
pub struct Bucket {
    pub lower: Option<ScalarValue>,
    pub upper: Option<ScalarValue>,
    pub frequency: f64,
}

impl Statistics {
    pub fn new(row_count: f64, column_stats: HashMap<ColId, ColumnStatistics>) -> Self {
        Self {
            row_count,
            column_stats,
        }
    }

    pub fn rows(&self) -> f64 {
        self.row_count
    }

    pub fn column(&self, col: &ColRef) -> Option<&ColumnStatistics> {
        self.column_stats.get(&col.id())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&ColId, &ColumnStatistics)> {
        self.column_stats.iter()
    }

    /// Same columns over `rows` rows. Distinct counts never exceed the row count.
    pub fn with_rows(&self, rows: f64) -> Statistics {
        let rows = rows.max(0.0);
        let column_stats = self
            .column_stats
            .iter()
            .map(|(id, stats)| {
                let mut stats = stats.clone();
                stats.ndv = stats.ndv.map(|ndv| ndv.min(rows));
                (*id, stats)
            })
            .collect();
        Statistics {
            row_count: rows,
            column_stats,
        }
    }

    /// Keeps the statistics of `cols` only.
    pub fn project(&self, cols: &ColRefSet) -> Statistics {
        Statistics {
            row_count: self.row_count,
            column_stats: self
                .column_stats
                .iter()
                .filter(|(id, _)| cols.contains_id(**id))
                .map(|(id, stats)| (*id, stats.clone()))
                .collect(),
        }
    }
}

impl ColumnStatistics {
    pub fn new(ndv: Option<f64>, null_fraction: f64, width: f64) -> Self {
        Self {
            ndv,
            null_fraction,
            width,
            buckets: vec![],
        }
    }

    pub fn with_buckets(mut self, buckets: Vec<Bucket>) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn ndv(&self) -> Option<f64> {
        self.ndv
    }

    pub fn null_fraction(&self) -> f64 {
        self.null_fraction
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }
}

/// Estimates statistics of relational operators from their inputs.
pub trait StatsEstimator: Debug {
    /// Statistics of reading `output` from `table`.
    fn estimate_base_table(
        &self,
        table: &TableDescriptor,
        output: &[ColRef],
    ) -> OptResult<Statistics>;

    /// Rows of `input` satisfying `predicate`. Never more than the input.
    fn apply_filter(&self, input: &Statistics, predicate: &Expression) -> Statistics;

    fn apply_limit(&self, input: &Statistics, count: u64) -> Statistics;

    fn cross_product(&self, left: &Statistics, right: &Statistics) -> Statistics;

    fn apply_group_by(&self, input: &Statistics, grouping: &ColRefSet) -> Statistics;
}
