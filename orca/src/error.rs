//! Error kinds raised by derivation and transformation code.
//!
//! Only conditions reachable from malformed-but-possible input are errors. Broken
//! preconditions (wrong arity, illegal state transitions, deriving a relational property on a
//! scalar node) are programming errors and panic instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("position {pos} out of range, only {len} columns")]
    OutOfRange { pos: usize, len: usize },
    /// The construct can't be represented. The driver prunes the alternative that raised it
    /// rather than failing the whole query.
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("optimization aborted")]
    Aborted,
    /// Rendering an expression tree failed.
    #[error("explain: {0}")]
    Explain(#[from] std::io::Error),
    #[error("metadata: {0}")]
    Metadata(
        #[source]
        #[from]
        anyhow::Error,
    ),
}

impl OptError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, OptError::Unsupported(_))
    }
}

pub type OptResult<T> = Result<T, OptError>;
