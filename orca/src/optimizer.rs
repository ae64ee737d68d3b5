use std::cell::Cell;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::column::ColumnFactory;
use crate::error::{OptError, OptResult};
use crate::metadata::{
    IndexDescriptor, IndexDescriptorRef, MdAccessor, MdId, TableDescriptor, TableDescriptorRef,
};
use crate::stats::{SimpleStatsEstimator, StatsEstimator};

/// Tunables of one optimization session.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizerConfig {
    /// Join associativity is not explored above this join depth.
    pub max_join_depth_for_associativity: usize,
    pub max_join_right_child_depth: usize,
    /// Upper bound of ranges a partial dynamic scan can carry on its partition key.
    pub max_partial_scan_ranges: usize,
    pub max_exploration_rounds: usize,
    pub default_filter_selectivity: f64,
    pub default_range_selectivity: f64,
    /// Row count assumed for relations without one.
    pub default_row_count: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_join_depth_for_associativity: 10,
            max_join_right_child_depth: 1,
            max_partial_scan_ranges: 8,
            max_exploration_rounds: 64,
            default_filter_selectivity: 0.4,
            default_range_selectivity: 1.0 / 3.0,
            default_row_count: 1000.0,
        }
    }
}

impl OptimizerConfig {
    pub fn with_max_join_depth_for_associativity(mut self, depth: usize) -> Self {
        self.max_join_depth_for_associativity = depth;
        self
    }

    pub fn with_max_join_right_child_depth(mut self, depth: usize) -> Self {
        self.max_join_right_child_depth = depth;
        self
    }

    pub fn with_max_partial_scan_ranges(mut self, ranges: usize) -> Self {
        self.max_partial_scan_ranges = ranges;
        self
    }

    pub fn with_max_exploration_rounds(mut self, rounds: usize) -> Self {
        self.max_exploration_rounds = rounds;
        self
    }

    pub fn with_default_filter_selectivity(mut self, selectivity: f64) -> Self {
        self.default_filter_selectivity = selectivity;
        self
    }

    pub fn with_default_range_selectivity(mut self, selectivity: f64) -> Self {
        self.default_range_selectivity = selectivity;
        self
    }

    pub fn with_default_row_count(mut self, rows: f64) -> Self {
        self.default_row_count = rows;
        self
    }
}

/// Context for optimization. Includes access to metadata, statistics and session scoped id
/// generators.
///
/// One context lives exactly as long as one optimization session. It is not `Sync`, sessions
/// are parallelized by giving each its own context.
pub struct OptimizerContext {
    md_accessor: Arc<dyn MdAccessor>,
    stats_estimator: Arc<dyn StatsEstimator>,
    column_factory: ColumnFactory,
    next_scan_id: Cell<u32>,
    next_operator_id: Cell<u32>,
    config: OptimizerConfig,
    abort: Arc<AtomicBool>,
}

impl OptimizerContext {
    pub fn new(md_accessor: Arc<dyn MdAccessor>, config: OptimizerConfig) -> Self {
        let stats_estimator = Arc::new(SimpleStatsEstimator::new(md_accessor.clone(), &config));
        Self {
            md_accessor,
            stats_estimator,
            column_factory: ColumnFactory::new(),
            next_scan_id: Cell::new(1),
            next_operator_id: Cell::new(1),
            config,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_stats_estimator(mut self, stats_estimator: Arc<dyn StatsEstimator>) -> Self {
        self.stats_estimator = stats_estimator;
        self
    }

    pub fn md_accessor(&self) -> &dyn MdAccessor {
        &*self.md_accessor
    }

    pub fn stats_estimator(&self) -> &dyn StatsEstimator {
        &*self.stats_estimator
    }

    pub fn column_factory(&self) -> &ColumnFactory {
        &self.column_factory
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Id shared by a dynamic scan and the partition selectors feeding it.
    pub fn next_scan_id(&self) -> u32 {
        let id = self.next_scan_id.get();
        self.next_scan_id.set(id + 1);
        id
    }

    /// Source operator id recorded on table bound columns.
    pub fn next_operator_id(&self) -> u32 {
        let id = self.next_operator_id.get();
        self.next_operator_id.set(id + 1);
        id
    }

    /// Handle an embedder can keep to cancel this session from another thread.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    pub fn check_abort(&self) -> OptResult<()> {
        if self.abort.load(Ordering::Relaxed) {
            Err(OptError::Aborted)
        } else {
            Ok(())
        }
    }

    pub fn table_descriptor(&self, mdid: MdId) -> OptResult<TableDescriptorRef> {
        let relation = self.md_accessor.retrieve_relation(mdid)?;
        Ok(Arc::new(TableDescriptor::from_relation(&relation)?))
    }

    pub fn index_descriptor(&self, mdid: MdId) -> OptResult<IndexDescriptorRef> {
        let index = self.md_accessor.retrieve_index(mdid)?;
        Ok(Arc::new(IndexDescriptor::new(&index)))
    }
}

impl Debug for OptimizerContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerContext")
            .field("md_accessor", &self.md_accessor)
            .field("stats_estimator", &self.stats_estimator)
            .field("columns", &self.column_factory.allocated())
            .field("config", &self.config)
            .finish()
    }
}
