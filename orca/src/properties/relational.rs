use crate::column::ColRefSet;
use crate::expression::ExpressionHandle;
use crate::properties::{KeyCollection, MaxCard, PartInfo, PropConstraint};

/// Logical properties derived bottom up for a relational expression.
///
/// Every logically equivalent expression of a memo group derives the same properties, so the
/// first derivation of a group is kept for all of its members.
#[derive(Clone, Debug, PartialEq)]
pub struct DrvdPropRelational {
    output_columns: ColRefSet,
    not_null_columns: ColRefSet,
    outer_references: ColRefSet,
    key_collection: KeyCollection,
    constraint: PropConstraint,
    part_info: PartInfo,
    max_card: MaxCard,
    join_depth: usize,
}

impl DrvdPropRelational {
    /// Derives all properties of `handle` from its children.
    ///
    /// # Panics
    ///
    /// If the operator of `handle` is not relational.
    pub fn derive(handle: &ExpressionHandle) -> Self {
        let op = handle.operator().as_relational();

        let output_columns = op.derive_output_columns(handle);
        let not_null_columns = op
            .derive_not_null_columns(handle, &output_columns)
            .intersection(&output_columns);
        let outer_references = op.derive_outer_references(handle);
        let key_collection = op.derive_key_collection(handle).project(&output_columns);
        let constraint = op.derive_constraint(handle).restrict(&output_columns);
        let part_info = op.derive_part_info(handle);
        let max_card = op.derive_max_card(handle);
        let join_depth = op.derive_join_depth(handle);

        Self {
            output_columns,
            not_null_columns,
            outer_references,
            key_collection,
            constraint,
            part_info,
            max_card,
            join_depth,
        }
    }

    pub fn output_columns(&self) -> &ColRefSet {
        &self.output_columns
    }

    pub fn not_null_columns(&self) -> &ColRefSet {
        &self.not_null_columns
    }

    pub fn outer_references(&self) -> &ColRefSet {
        &self.outer_references
    }

    pub fn has_outer_references(&self) -> bool {
        !self.outer_references.is_empty()
    }

    pub fn key_collection(&self) -> &KeyCollection {
        &self.key_collection
    }

    pub fn constraint(&self) -> &PropConstraint {
        &self.constraint
    }

    pub fn part_info(&self) -> &PartInfo {
        &self.part_info
    }

    pub fn max_card(&self) -> MaxCard {
        self.max_card
    }

    pub fn join_depth(&self) -> usize {
        self.join_depth
    }
}
