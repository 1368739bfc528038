//! Error types for entry and modification handling.

use thiserror::Error;

/// Errors raised while patching an entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// A delete named an attribute the entry does not have.
    #[error("no such attribute: {key}")]
    NoSuchAttribute { key: String },

    /// A delete named a value the attribute does not hold.
    #[error("attribute {key} has no value {value:?}")]
    NoSuchValue { key: String, value: String },
}

/// Convenience alias for entry operations.
pub type EntryResult<T> = Result<T, EntryError>;
