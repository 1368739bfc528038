//! Error types for filter parsing.

use thiserror::Error;

/// Errors produced while parsing a filter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The text does not follow the filter grammar.
    #[error("invalid filter {text:?} at offset {offset}: {message}")]
    Parse {
        message: String,
        offset: usize,
        text: String,
    },
}

/// Convenience alias for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;
