//! A compact memo and the exploration driver applying xforms to it.
//!
//! A [`Memo`] stores equivalent expressions in groups. Every child of a group expression is a
//! group, so alternatives for a sub tree are shared by all expressions reading it. Scalar sub
//! trees get groups too, one per node, and keep the tree they were inserted with.
//!
//! The [`Explorer`] drives xforms over the memo until no new group expression shows up. Plan
//! costing and selection are not part of this module.
mod memo;
pub use memo::*;
mod binding;
mod explorer;
pub use explorer::*;
