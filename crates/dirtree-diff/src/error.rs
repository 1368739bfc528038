//! Error types for the diff crate.

use dirtree_name::Dn;

/// Errors that can occur while diffing two trees.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The two starting nodes have different distinguished names.
    #[error("cannot diff {a} against {b}: names differ")]
    RootMismatch { a: Dn, b: Dn },

    /// Reading one of the trees failed.
    #[error("tree error: {0}")]
    Tree(#[from] dirtree_store::TreeError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
