use crate::column::ColRef;
use crate::properties::PhysicalProp;

/// Ordering of one column.
#[derive(Hash, Debug, Clone, Eq, PartialEq)]
pub struct Ordering {
    column: ColRef,
    /// Ascending or descending.
    asc: bool,
    /// Should null be treated first.
    null_first: bool,
}

impl Ordering {
    pub fn new(column: ColRef, asc: bool, null_first: bool) -> Self {
        Self {
            column,
            asc,
            null_first,
        }
    }

    pub fn asc(column: ColRef) -> Self {
        Self::new(column, true, false)
    }

    pub fn column(&self) -> &ColRef {
        &self.column
    }

    pub fn is_asc(&self) -> bool {
        self.asc
    }

    pub fn is_null_first(&self) -> bool {
        self.null_first
    }
}

/// Ordering property specification.
#[derive(Hash, Debug, Clone, Eq, PartialEq, Default)]
pub struct OrderSpec {
    orders: Vec<Ordering>,
}

impl OrderSpec {
    pub fn new(orders: Vec<Ordering>) -> Self {
        Self { orders }
    }

    pub fn orders(&self) -> &[Ordering] {
        &self.orders
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColRef> {
        self.orders.iter().map(|o| &o.column)
    }
}

impl PhysicalProp for OrderSpec {
    /// An order satisfies every prefix of itself.
    fn satisfies(&self, required: &Self) -> bool {
        required.orders.len() <= self.orders.len()
            && required.orders.iter().zip(&self.orders).all(|(r, o)| r == o)
    }
}
