//! Error types for distinguished name handling.

use thiserror::Error;

/// Errors produced while parsing or manipulating names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The text is not a legal distinguished name.
    #[error("malformed distinguished name {text:?}: {reason}")]
    Malformed { text: String, reason: String },

    /// `up()` was called on a name with no components.
    #[error("the empty distinguished name has no parent")]
    EmptyDn,
}

impl NameError {
    pub(crate) fn malformed(text: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for name operations.
pub type NameResult<T> = Result<T, NameError>;
