//! ## Background
//!
//! A cascades style optimizer [2] keeps every alternative it finds for a sub plan in a memo, and
//! reaches new alternatives by applying transformation rules to what the memo already holds.
//! Orca [3] built its optimizer for MPP databases on this model: operators are pure value
//! objects, derived properties are computed bottom up and shared, and rules (xforms) never touch
//! the search structure directly.
//!
//! This crate implements the operator, expression and xform layer of such an optimizer, plus a
//! compact memo and exploration driver exercising it. Cost based plan selection is left to an
//! embedder.
//!
//! ## Design
//!
//! * [`metadata`] Read-only metadata lookup and table/index descriptors.
//! * [`column`] Column references and the session scoped column factory.
//! * [`operator`] Logical, physical, scalar and pattern operators.
//! * [`expression`] Immutable expression trees and the handle derivations run against.
//! * [`properties`] Relational, scalar and plan properties.
//! * [`stats`] Statistics and their estimation.
//! * [`xforms`] Transformation rule definition and implementation.
//! * [`search`] Memo and exploration driver.
//!
//! ## Reference
//!
//! 1. Selinger, P. Griffiths, et al. "Access path selection in a relational database management
//! system." Readings in Artificial Intelligence and Databases. Morgan Kaufmann, 1989. 511-522.
//! 2. Graefe, G., 1995. The cascades framework for query optimization. IEEE Data Eng. Bull., 18(3),
//! pp.19-29.
//! 3. Soliman, M.A., Antova, L., Raghavan, V., El-Helw, A., Gu, Z., Shen, E., Caragea, G.C.,
//! Garcia-Alvarado, C., Rahman, F., Petropoulos, M. and Waas, F., 2014, June.  Orca: a modular
//! query optimizer architecture for big data. In Proceedings of the 2014 ACM SIGMOD
//! international  conference on Management of data (pp. 337-348).
//! 4. Columnbia Project, https://github.com/yongwen/columbia

#[macro_use]
extern crate prettytable;
#[macro_use]
extern crate lazy_static;

pub mod column;
pub mod error;
pub mod expression;
pub mod metadata;
pub mod operator;
pub mod optimizer;
pub mod properties;
pub mod search;
pub mod stats;
pub mod xforms;

#[cfg(test)]
mod test_utils;
