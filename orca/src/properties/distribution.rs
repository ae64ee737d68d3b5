use crate::column::ColRef;
use crate::metadata::{DistributionPolicy, TableDescriptor};
use crate::properties::PhysicalProp;

#[derive(Hash, Debug, Clone, Eq, PartialEq, Default)]
pub enum DistributionSpec {
    /// No requirement.
    #[default]
    Any,
    /// The data set is not partitioned and has only one partition.
    Singleton,
    /// The data set is partitioned according to hash values of columns.
    Hashed(Vec<ColRef>),
    /// The data set has several partitions, but the partitioning doesn't following any rule.
    Random,
    /// Every partition holds the whole data set.
    Replicated,
}

impl DistributionSpec {
    /// Distribution of a base table read through `output`.
    ///
    /// Hash distribution degrades to random when the table asks for it or when a distribution
    /// column isn't read.
    pub fn of_table(table: &TableDescriptor, output: &[ColRef]) -> DistributionSpec {
        match table.distribution() {
            DistributionPolicy::Hash if !table.convert_hash_to_random() => {
                let columns: Option<Vec<ColRef>> = table
                    .distribution_columns()
                    .iter()
                    .map(|pos| {
                        let attno = table.column_at(*pos).attno;
                        output.iter().find(|c| c.attno() == Some(attno)).cloned()
                    })
                    .collect();
                match columns {
                    Some(columns) if !columns.is_empty() => DistributionSpec::Hashed(columns),
                    _ => DistributionSpec::Random,
                }
            }
            DistributionPolicy::Hash | DistributionPolicy::Random => DistributionSpec::Random,
            DistributionPolicy::Replicated => DistributionSpec::Replicated,
            DistributionPolicy::MasterOnly => DistributionSpec::Singleton,
        }
    }
}

impl PhysicalProp for DistributionSpec {
    fn satisfies(&self, required: &Self) -> bool {
        match (self, required) {
            (_, DistributionSpec::Any) => true,
            (DistributionSpec::Hashed(cols), DistributionSpec::Hashed(required_cols)) => {
                cols == required_cols
            }
            (DistributionSpec::Replicated, DistributionSpec::Singleton) => true,
            (this, required) => this == required,
        }
    }
}
