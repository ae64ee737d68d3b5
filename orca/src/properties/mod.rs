//! Properties of operators and expressions.
//!
//! Relational and scalar properties are logical: they are shared by every logically equivalent
//! expression, e.g. output columns, keys or constraints. They are derived bottom up once per
//! expression or memo group. Physical properties are concerned with distribution, sorting and
//! rewindability of a physical plan.
mod constraint;
pub use constraint::*;
mod distribution;
pub use distribution::*;
mod keys;
pub use keys::*;
mod max_card;
pub use max_card::*;
mod order;
pub use order::*;
mod part_info;
pub use part_info::*;
mod physical;
pub use physical::*;
mod relational;
pub use relational::*;
mod rewindability;
pub use rewindability::*;
mod scalar;
pub use scalar::*;

use std::fmt::Debug;
use std::hash::Hash;

pub trait PhysicalProp: Debug + Hash {
    /// Tests whether self satisfies `required`.
    fn satisfies(&self, required: &Self) -> bool;
}
