use std::sync::Arc;

use crate::metadata::{IndexMd, IndexType, MdId};

/// Index as used by index and bitmap scans.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexDescriptor {
    mdid: MdId,
    name: String,
    key_columns: Vec<usize>,
    included_columns: Vec<usize>,
    index_type: IndexType,
    clustered: bool,
}

pub type IndexDescriptorRef = Arc<IndexDescriptor>;

impl IndexDescriptor {
    pub fn new(md: &IndexMd) -> Self {
        Self {
            mdid: md.id,
            name: md.name.clone(),
            key_columns: md.key_columns.clone(),
            included_columns: md.included_columns.clone(),
            index_type: md.index_type,
            clustered: md.clustered,
        }
    }

    pub fn mdid(&self) -> MdId {
        self.mdid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Positions of key columns in the indexed relation.
    pub fn key_columns(&self) -> &[usize] {
        &self.key_columns
    }

    pub fn included_columns(&self) -> &[usize] {
        &self.included_columns
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    pub fn is_clustered(&self) -> bool {
        self.clustered
    }
}
