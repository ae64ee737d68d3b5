use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use prettytable::Table;

use crate::error::{OptError, OptResult};
use crate::metadata::{ColumnMd, ColumnType, DistributionPolicy, MdId, RelationMd, StorageType};

/// Column of a base relation as seen by the optimizer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub attno: i32,
    pub nullable: bool,
    pub width: u32,
    pub is_system: bool,
}

impl From<&ColumnMd> for ColumnDescriptor {
    fn from(md: &ColumnMd) -> Self {
        Self {
            name: md.name.clone(),
            column_type: md.column_type.clone(),
            attno: md.attno,
            nullable: md.nullable,
            width: md.width,
            is_system: md.is_system,
        }
    }
}

/// Description of a base relation shared by every operator reading it.
///
/// Built once, then only read through [`TableDescriptorRef`]. Identity (equality and hash) is
/// the relation's metadata id.
#[derive(Clone, Debug)]
pub struct TableDescriptor {
    mdid: MdId,
    name: String,
    columns: Vec<ColumnDescriptor>,
    distribution: DistributionPolicy,
    distribution_columns: Vec<usize>,
    storage: StorageType,
    key_sets: Vec<BTreeSet<usize>>,
    partition_columns: Vec<usize>,
    leaf_partitions: Vec<MdId>,
    convert_hash_to_random: bool,
    owner: u32,
}

pub type TableDescriptorRef = Arc<TableDescriptor>;

impl TableDescriptor {
    pub fn new<S: Into<String>>(
        mdid: MdId,
        name: S,
        distribution: DistributionPolicy,
        storage: StorageType,
    ) -> Self {
        Self {
            mdid,
            name: name.into(),
            columns: vec![],
            distribution,
            distribution_columns: vec![],
            storage,
            key_sets: vec![],
            partition_columns: vec![],
            leaf_partitions: vec![],
            convert_hash_to_random: false,
            owner: 0,
        }
    }

    pub fn from_relation(relation: &RelationMd) -> OptResult<Self> {
        let mut desc = Self::new(
            relation.id,
            relation.name.clone(),
            relation.distribution,
            relation.storage,
        );
        desc.convert_hash_to_random = relation.convert_hash_to_random;
        desc.owner = relation.owner;

        for column in &relation.columns {
            desc.add_column(ColumnDescriptor::from(column))?;
        }
        for pos in &relation.distribution_columns {
            desc.add_distribution_column(*pos)?;
        }
        for pos in &relation.partition_columns {
            desc.add_partition_column(*pos)?;
        }
        for key in &relation.keys {
            if !desc.add_key_set(key.iter().copied().collect()) {
                log::warn!("Skipped invalid key {:?} of relation {}", key, relation.name);
            }
        }
        for partition in &relation.partitions {
            desc.leaf_partitions.push(partition.id);
        }

        Ok(desc)
    }

    pub fn add_column(&mut self, column: ColumnDescriptor) -> OptResult<()> {
        if self.columns.iter().any(|c| c.attno == column.attno) {
            return Err(OptError::InvalidArgument(format!(
                "attribute number {} already present in {}",
                column.attno, self.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn add_distribution_column(&mut self, pos: usize) -> OptResult<()> {
        self.check_position(pos)?;
        self.distribution_columns.push(pos);
        Ok(())
    }

    pub fn add_partition_column(&mut self, pos: usize) -> OptResult<()> {
        self.check_position(pos)?;
        self.partition_columns.push(pos);
        Ok(())
    }

    /// Records a candidate key. Returns false and records nothing if the key references a
    /// position outside the descriptor.
    pub fn add_key_set(&mut self, key: BTreeSet<usize>) -> bool {
        if key.is_empty() || key.iter().any(|pos| *pos >= self.columns.len()) {
            return false;
        }
        if !self.key_sets.contains(&key) {
            self.key_sets.push(key);
        }
        true
    }

    pub fn add_leaf_partition(&mut self, partition: MdId) {
        self.leaf_partitions.push(partition);
    }

    pub fn with_convert_hash_to_random(mut self, convert: bool) -> Self {
        self.convert_hash_to_random = convert;
        self
    }

    pub fn with_owner(mut self, owner: u32) -> Self {
        self.owner = owner;
        self
    }

    fn check_position(&self, pos: usize) -> OptResult<()> {
        if pos >= self.columns.len() {
            return Err(OptError::OutOfRange {
                pos,
                len: self.columns.len(),
            });
        }
        Ok(())
    }

    pub fn mdid(&self) -> MdId {
        self.mdid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_at(&self, pos: usize) -> &ColumnDescriptor {
        &self.columns[pos]
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Position of the column with the given attribute number.
    pub fn position_of_attno(&self, attno: i32) -> Option<usize> {
        self.columns.iter().position(|c| c.attno == attno)
    }

    pub fn distribution(&self) -> DistributionPolicy {
        self.distribution
    }

    pub fn distribution_columns(&self) -> &[usize] {
        &self.distribution_columns
    }

    pub fn storage_type(&self) -> StorageType {
        self.storage
    }

    pub fn key_sets(&self) -> &[BTreeSet<usize>] {
        &self.key_sets
    }

    pub fn partition_columns(&self) -> &[usize] {
        &self.partition_columns
    }

    pub fn is_partitioned(&self) -> bool {
        !self.partition_columns.is_empty()
    }

    pub fn leaf_partitions(&self) -> &[MdId] {
        &self.leaf_partitions
    }

    pub fn leaf_partition_count(&self) -> usize {
        self.leaf_partitions.len()
    }

    pub fn convert_hash_to_random(&self) -> bool {
        self.convert_hash_to_random
    }

    pub fn owner(&self) -> u32 {
        self.owner
    }
}

impl PartialEq for TableDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.mdid == other.mdid
    }
}

impl Eq for TableDescriptor {}

impl Hash for TableDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mdid.hash(state)
    }
}

impl Display for TableDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({})", self.name, self.mdid)?;
        let mut table = Table::new();
        table.set_titles(row!["Position", "Name", "Type", "Attno", "Nullable"]);
        for (pos, column) in self.columns.iter().enumerate() {
            table.add_row(row![
                pos,
                column.name,
                format!("{:?}", column.column_type.data_type),
                column.attno,
                column.nullable
            ]);
        }
        write!(f, "{}", table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::column_descriptor;
    use arrow_schema::DataType;
    use maplit::btreeset;

    fn three_column_table() -> TableDescriptor {
        let mut desc =
            TableDescriptor::new(MdId(1), "emp", DistributionPolicy::Hash, StorageType::Heap);
        desc.add_column(column_descriptor("id", DataType::Int32, 1, false))
            .unwrap();
        desc.add_column(column_descriptor("name", DataType::Utf8, 2, true))
            .unwrap();
        desc.add_column(column_descriptor("dept", DataType::Int32, 3, true))
            .unwrap();
        desc
    }

    #[test]
    fn test_duplicate_attno_rejected() {
        let mut desc = three_column_table();
        let err = desc
            .add_column(column_descriptor("other", DataType::Int32, 2, true))
            .unwrap_err();
        assert!(matches!(err, OptError::InvalidArgument(_)));
        assert_eq!(3, desc.column_count());
    }

    #[test]
    fn test_out_of_range_positions() {
        let mut desc = three_column_table();
        assert!(matches!(
            desc.add_distribution_column(3),
            Err(OptError::OutOfRange { pos: 3, len: 3 })
        ));
        assert!(matches!(
            desc.add_partition_column(7),
            Err(OptError::OutOfRange { pos: 7, len: 3 })
        ));
        desc.add_distribution_column(0).unwrap();
        assert_eq!(&[0], desc.distribution_columns());
        assert!(!desc.is_partitioned());
        desc.add_partition_column(2).unwrap();
        assert!(desc.is_partitioned());
    }

    #[test]
    fn test_invalid_key_set_is_noop() {
        let mut desc = three_column_table();
        assert!(!desc.add_key_set(btreeset! {0, 5}));
        assert!(desc.key_sets().is_empty());
        assert!(desc.add_key_set(btreeset! {0}));
        assert_eq!(1, desc.key_sets().len());
    }

    #[test]
    fn test_identity_is_mdid() {
        let a = three_column_table();
        let b = TableDescriptor::new(MdId(1), "alias", DistributionPolicy::Random, StorageType::Heap);
        assert_eq!(a, b);
        assert_eq!(Some(1), a.position_of_attno(2));
        assert!(a.to_string().contains("dept"));
    }
}
