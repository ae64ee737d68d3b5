use crate::properties::PhysicalProp;

#[derive(Hash, Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum RewindabilitySpec {
    /// No requirement.
    #[default]
    Any,
    /// Output can be re-read from the start without re-executing the subtree.
    Rewindable,
    NotRewindable,
}

impl PhysicalProp for RewindabilitySpec {
    fn satisfies(&self, required: &Self) -> bool {
        match required {
            RewindabilitySpec::Any => true,
            RewindabilitySpec::Rewindable => *self == RewindabilitySpec::Rewindable,
            RewindabilitySpec::NotRewindable => true,
        }
    }
}
