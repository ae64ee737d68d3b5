use std::collections::HashMap;

use crate::column::{ColId, ColRef, ColRefSet, ColumnFactory};
use crate::error::{OptError, OptResult};
use crate::metadata::ColumnDescriptor;

/// Column replacement table keyed by the id of the column being replaced.
pub type ColRefMap = HashMap<ColId, ColRef>;

/// One fresh table bound column per descriptor, in descriptor order.
pub fn create_mapping(
    factory: &ColumnFactory,
    columns: &[ColumnDescriptor],
    source_op_id: u32,
) -> Vec<ColRef> {
    columns
        .iter()
        .map(|c| factory.create_from_descriptor(c, source_op_id))
        .collect()
}

/// Maps every column to itself.
pub fn identity_map<'a, I: IntoIterator<Item = &'a ColRef>>(cols: I) -> ColRefMap {
    cols.into_iter().map(|c| (c.id(), c.clone())).collect()
}

pub fn remap_column(col: &ColRef, map: &ColRefMap, must_exist: bool) -> OptResult<ColRef> {
    match map.get(&col.id()) {
        Some(new_col) => Ok(new_col.clone()),
        None if must_exist => Err(OptError::InvalidArgument(format!(
            "no mapping for column {:?}",
            col
        ))),
        None => Ok(col.clone()),
    }
}

/// Replaces each column by its mapping, keeping order.
///
/// When `must_exist` is false an unmapped column is passed through unchanged.
pub fn remap_columns(cols: &[ColRef], map: &ColRefMap, must_exist: bool) -> OptResult<Vec<ColRef>> {
    cols.iter()
        .map(|c| remap_column(c, map, must_exist))
        .collect()
}

pub fn remap_column_set(cols: &ColRefSet, map: &ColRefMap, must_exist: bool) -> OptResult<ColRefSet> {
    cols.iter()
        .map(|c| remap_column(c, map, must_exist))
        .collect()
}

pub fn remap_column_arrays(
    arrays: &[Vec<ColRef>],
    map: &ColRefMap,
    must_exist: bool,
) -> OptResult<Vec<Vec<ColRef>>> {
    arrays
        .iter()
        .map(|cols| remap_columns(cols, map, must_exist))
        .collect()
}
