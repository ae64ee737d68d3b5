//! Column references.
//!
//! A [`ColRef`] names one column instance inside an expression tree. Two references denote the
//! same column iff their ids match; names are only for display. Ids come from the session's
//! [`ColumnFactory`], never from global state.
mod set;
pub use set::*;
mod remap;
pub use remap::*;

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use derive_more::Display;

use crate::metadata::{ColumnDescriptor, ColumnType};

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColRefKind {
    /// Produced by a scalar computation, e.g. a project element.
    Computed,
    /// Read from a base table.
    Table {
        attno: i32,
        nullable: bool,
        source_op_id: u32,
        width: u32,
    },
}

#[derive(Debug)]
struct ColRefInner {
    id: ColId,
    name: String,
    column_type: ColumnType,
    kind: ColRefKind,
}

/// Shared handle of a column. Immutable after creation, copy through the factory to remap.
#[derive(Clone)]
pub struct ColRef(Arc<ColRefInner>);

impl ColRef {
    pub fn id(&self) -> ColId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.0.column_type
    }

    pub fn kind(&self) -> &ColRefKind {
        &self.0.kind
    }

    pub fn attno(&self) -> Option<i32> {
        match &self.0.kind {
            ColRefKind::Table { attno, .. } => Some(*attno),
            ColRefKind::Computed => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        match &self.0.kind {
            ColRefKind::Table { nullable, .. } => *nullable,
            ColRefKind::Computed => true,
        }
    }

    pub fn width(&self) -> u32 {
        match &self.0.kind {
            ColRefKind::Table { width, .. } => *width,
            ColRefKind::Computed => self
                .0
                .column_type
                .data_type
                .primitive_width()
                .unwrap_or(8) as u32,
        }
    }
}

impl PartialEq for ColRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ColRef {}

impl Hash for ColRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state)
    }
}

impl PartialOrd for ColRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ColRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl Debug for ColRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name(), self.id())
    }
}

impl Display for ColRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name(), self.id())
    }
}

/// Allocates column references for one optimization session.
#[derive(Debug, Default)]
pub struct ColumnFactory {
    next_id: Cell<u32>,
    columns: RefCell<HashMap<ColId, ColRef>>,
}

impl ColumnFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_col_id(&self) -> ColId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ColId(id)
    }

    fn register(&self, name: &str, column_type: ColumnType, kind: ColRefKind) -> ColRef {
        assert!(!name.is_empty(), "Column reference must have a name");
        let col = ColRef(Arc::new(ColRefInner {
            id: self.next_col_id(),
            name: name.to_string(),
            column_type,
            kind,
        }));
        self.columns.borrow_mut().insert(col.id(), col.clone());
        col
    }

    pub fn create_computed(&self, name: &str, column_type: ColumnType) -> ColRef {
        self.register(name, column_type, ColRefKind::Computed)
    }

    pub fn create_from_descriptor(&self, column: &ColumnDescriptor, source_op_id: u32) -> ColRef {
        self.register(
            &column.name,
            column.column_type.clone(),
            ColRefKind::Table {
                attno: column.attno,
                nullable: column.nullable,
                source_op_id,
                width: column.width,
            },
        )
    }

    /// A fresh column with the same name, type and origin as `col`.
    pub fn copy(&self, col: &ColRef) -> ColRef {
        self.register(col.name(), col.column_type().clone(), col.kind().clone())
    }

    pub fn lookup(&self, id: ColId) -> Option<ColRef> {
        self.columns.borrow().get(&id).cloned()
    }

    pub fn allocated(&self) -> usize {
        self.next_id.get() as usize
    }
}
