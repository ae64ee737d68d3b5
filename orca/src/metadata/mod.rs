//! Read-only metadata lookup.
//!
//! The optimizer never owns catalog data. It reads relations and indexes through a
//! [`MdAccessor`] which must return the same snapshot for the duration of one session.
mod table_descriptor;
pub use table_descriptor::*;
mod index_descriptor;
pub use index_descriptor::*;

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use anyhow::anyhow;
use arrow_schema::DataType;
use datafusion_common::ScalarValue;
use derive_more::Display;

use crate::error::OptResult;

/// Opaque metadata id of a relation, partition or index.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display(fmt = "0.{}", _0)]
pub struct MdId(pub u64);

/// Semantic type of a column.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnType {
    pub data_type: DataType,
    pub type_modifier: i32,
}

impl ColumnType {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            type_modifier: -1,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DistributionPolicy {
    /// Hash distributed on the descriptor's distribution columns.
    Hash,
    Random,
    Replicated,
    MasterOnly,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorageType {
    Heap,
    AppendOnlyRow,
    AppendOnlyColumn,
    External,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnMd {
    pub name: String,
    pub column_type: ColumnType,
    pub attno: i32,
    pub nullable: bool,
    pub width: u32,
    pub is_system: bool,
}

impl ColumnMd {
    pub fn new<S: Into<String>>(name: S, data_type: DataType, attno: i32, nullable: bool) -> Self {
        let width = data_type.primitive_width().unwrap_or(8) as u32;
        Self {
            name: name.into(),
            column_type: ColumnType::new(data_type),
            attno,
            nullable,
            width,
            is_system: attno < 0,
        }
    }
}

/// One leaf partition of a range partitioned table.
///
/// Covers `[lower, upper)` on the first partition key, `None` meaning unbounded.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionMd {
    pub id: MdId,
    pub lower: Option<ScalarValue>,
    pub upper: Option<ScalarValue>,
    /// Column names in the partition's physical order. Empty when the layout equals the root's.
    pub column_names: Vec<String>,
    pub rows: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnStatsMd {
    pub ndv: f64,
    pub null_fraction: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RelationMd {
    pub id: MdId,
    pub name: String,
    pub columns: Vec<ColumnMd>,
    pub distribution: DistributionPolicy,
    pub distribution_columns: Vec<usize>,
    pub storage: StorageType,
    pub keys: Vec<Vec<usize>>,
    pub partition_columns: Vec<usize>,
    pub partitions: Vec<PartitionMd>,
    pub indexes: Vec<MdId>,
    pub rows: Option<f64>,
    /// Keyed by attribute number.
    pub column_stats: HashMap<i32, ColumnStatsMd>,
    pub convert_hash_to_random: bool,
    pub owner: u32,
}

impl RelationMd {
    pub fn new<S: Into<String>>(id: MdId, name: S, columns: Vec<ColumnMd>) -> Self {
        Self {
            id,
            name: name.into(),
            columns,
            distribution: DistributionPolicy::Random,
            distribution_columns: vec![],
            storage: StorageType::Heap,
            keys: vec![],
            partition_columns: vec![],
            partitions: vec![],
            indexes: vec![],
            rows: None,
            column_stats: HashMap::new(),
            convert_hash_to_random: false,
            owner: 0,
        }
    }

    pub fn with_hash_distribution(mut self, columns: Vec<usize>) -> Self {
        self.distribution = DistributionPolicy::Hash;
        self.distribution_columns = columns;
        self
    }

    pub fn with_distribution(mut self, distribution: DistributionPolicy) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_storage(mut self, storage: StorageType) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_key(mut self, key: Vec<usize>) -> Self {
        self.keys.push(key);
        self
    }

    pub fn with_partitions(mut self, partition_columns: Vec<usize>, partitions: Vec<PartitionMd>) -> Self {
        self.partition_columns = partition_columns;
        self.partitions = partitions;
        self
    }

    pub fn with_index(mut self, index: MdId) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_rows(mut self, rows: f64) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn with_column_stats(mut self, attno: i32, ndv: f64, null_fraction: f64) -> Self {
        self.column_stats.insert(attno, ColumnStatsMd { ndv, null_fraction });
        self
    }

    pub fn partition(&self, id: MdId) -> Option<&PartitionMd> {
        self.partitions.iter().find(|p| p.id == id)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexType {
    BTree,
    Bitmap,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexMd {
    pub id: MdId,
    pub name: String,
    /// Positions of key columns in the relation.
    pub key_columns: Vec<usize>,
    pub included_columns: Vec<usize>,
    pub index_type: IndexType,
    pub clustered: bool,
}

/// Metadata lookup interface.
pub trait MdAccessor: Debug {
    fn retrieve_relation(&self, id: MdId) -> OptResult<Arc<RelationMd>>;

    fn retrieve_index(&self, id: MdId) -> OptResult<Arc<IndexMd>>;

    fn retrieve_column_stats(&self, id: MdId, attno: i32) -> OptResult<Option<ColumnStatsMd>> {
        Ok(self.retrieve_relation(id)?.column_stats.get(&attno).cloned())
    }
}

/// Map backed metadata accessor.
#[derive(Debug, Default)]
pub struct MemoryMdAccessor {
    relations: HashMap<MdId, Arc<RelationMd>>,
    indexes: HashMap<MdId, Arc<IndexMd>>,
}

impl MemoryMdAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_relation(&mut self, relation: RelationMd) -> &mut Self {
        self.relations.insert(relation.id, Arc::new(relation));
        self
    }

    pub fn register_index(&mut self, index: IndexMd) -> &mut Self {
        self.indexes.insert(index.id, Arc::new(index));
        self
    }
}

impl MdAccessor for MemoryMdAccessor {
    fn retrieve_relation(&self, id: MdId) -> OptResult<Arc<RelationMd>> {
        self.relations
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("Relation {} not exists", id).into())
    }

    fn retrieve_index(&self, id: MdId) -> OptResult<Arc<IndexMd>> {
        self.indexes
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("Index {} not exists", id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptError;

    #[test]
    fn test_missing_relation_is_metadata_error() {
        let accessor = MemoryMdAccessor::new();
        let err = accessor.retrieve_relation(MdId(42)).unwrap_err();
        assert!(matches!(err, OptError::Metadata(_)));
        assert!(err.to_string().contains("0.42"));
    }

    #[test]
    fn test_column_stats_lookup() {
        let mut accessor = MemoryMdAccessor::new();
        accessor.register_relation(
            RelationMd::new(
                MdId(1),
                "t1",
                vec![ColumnMd::new("c1", DataType::Int32, 1, false)],
            )
            .with_column_stats(1, 10.0, 0.0),
        );

        let stats = accessor.retrieve_column_stats(MdId(1), 1).unwrap().unwrap();
        assert_eq!(10.0, stats.ndv);
        assert!(accessor.retrieve_column_stats(MdId(1), 2).unwrap().is_none());
    }
}
