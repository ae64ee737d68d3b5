use std::fmt::{Debug, Formatter};

use itertools::Itertools;

use crate::column::ColRefSet;

/// Candidate unique column groups known to hold on an expression's output.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyCollection {
    keys: Vec<ColRefSet>,
}

impl KeyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key unless it's empty or already present.
    pub fn add(&mut self, key: ColRefSet) {
        if !key.is_empty() && !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    pub fn keys(&self) -> &[ColRefSet] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether some key is made only of columns in `cols`.
    pub fn has_key_within(&self, cols: &ColRefSet) -> bool {
        self.keys.iter().any(|k| k.is_subset(cols))
    }

    /// Keeps only keys surviving in `output`.
    pub fn project(&self, output: &ColRefSet) -> KeyCollection {
        KeyCollection {
            keys: self
                .keys
                .iter()
                .filter(|k| k.is_subset(output))
                .cloned()
                .collect(),
        }
    }

    /// Keys of a product: every pair of keys unioned.
    pub fn combine(&self, other: &KeyCollection) -> KeyCollection {
        let mut result = KeyCollection::new();
        for (left, right) in self.keys.iter().cartesian_product(other.keys.iter()) {
            result.add(left.union(right));
        }
        result
    }
}

impl FromIterator<ColRefSet> for KeyCollection {
    fn from_iter<T: IntoIterator<Item = ColRefSet>>(iter: T) -> Self {
        let mut keys = KeyCollection::new();
        for key in iter {
            keys.add(key);
        }
        keys
    }
}

impl Debug for KeyCollection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.keys.iter().map(|k| format!("{:?}", k)).join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnFactory;
    use crate::metadata::ColumnType;
    use arrow_schema::DataType;

    #[test]
    fn test_project_and_combine() {
        let factory = ColumnFactory::new();
        let cols: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|n| factory.create_computed(n, ColumnType::new(DataType::Int32)))
            .collect();

        let mut keys = KeyCollection::new();
        keys.add(ColRefSet::from_iter(&cols[0..1]));
        keys.add(ColRefSet::from_iter(&cols[1..3]));
        keys.add(ColRefSet::from_iter(&cols[0..1]));
        assert_eq!(2, keys.len());

        let output = ColRefSet::from_iter(&cols[0..2]);
        let projected = keys.project(&output);
        assert_eq!(1, projected.len());
        assert!(projected.has_key_within(&output));

        let combined = projected.combine(&keys);
        assert_eq!(2, combined.len());
        assert!(combined.keys().iter().all(|k| k.contains(&cols[0])));
    }
}
