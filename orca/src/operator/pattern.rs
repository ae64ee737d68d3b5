use strum_macros::AsRefStr;

/// Placeholders used by xform patterns.
///
/// Only [`PatternOperator::PatternLeaf`] shows up in expressions, as the operator of a leaf bound
/// to a memo group.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, AsRefStr)]
pub enum PatternOperator {
    /// Matches any group without looking into it.
    PatternLeaf,
    /// Matches any subtree and binds it completely.
    PatternTree,
    /// Matches any number of trailing groups.
    PatternMultiLeaf,
}
