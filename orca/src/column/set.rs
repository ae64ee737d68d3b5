use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};

use itertools::Itertools;

use crate::column::{ColId, ColRef};

/// Ordered set of columns, compared by id.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ColRefSet(BTreeSet<ColRef>);

impl ColRefSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(&mut self, col: ColRef) {
        self.0.insert(col);
    }

    pub fn include_all<'a, I: IntoIterator<Item = &'a ColRef>>(&mut self, cols: I) {
        self.0.extend(cols.into_iter().cloned());
    }

    pub fn exclude(&mut self, col: &ColRef) {
        self.0.remove(col);
    }

    pub fn contains(&self, col: &ColRef) -> bool {
        self.0.contains(col)
    }

    pub fn contains_id(&self, id: ColId) -> bool {
        self.0.iter().any(|c| c.id() == id)
    }

    pub fn is_subset(&self, other: &ColRefSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_disjoint(&self, other: &ColRefSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn union(&self, other: &ColRefSet) -> ColRefSet {
        ColRefSet(self.0.union(&other.0).cloned().collect())
    }

    pub fn intersection(&self, other: &ColRefSet) -> ColRefSet {
        ColRefSet(self.0.intersection(&other.0).cloned().collect())
    }

    pub fn difference(&self, other: &ColRefSet) -> ColRefSet {
        ColRefSet(self.0.difference(&other.0).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColRef> {
        self.0.iter()
    }

    pub fn ids(&self) -> Vec<ColId> {
        self.0.iter().map(ColRef::id).collect()
    }
}

impl FromIterator<ColRef> for ColRefSet {
    fn from_iter<T: IntoIterator<Item = ColRef>>(iter: T) -> Self {
        ColRefSet(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a ColRef> for ColRefSet {
    fn from_iter<T: IntoIterator<Item = &'a ColRef>>(iter: T) -> Self {
        ColRefSet(iter.into_iter().cloned().collect())
    }
}

impl IntoIterator for ColRefSet {
    type Item = ColRef;
    type IntoIter = std::collections::btree_set::IntoIter<ColRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Debug for ColRefSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.0.iter().map(|c| format!("{:?}", c)).join(", "))
    }
}
