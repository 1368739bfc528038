//! Tree diff for the dirtree directory engine.
//!
//! [`diff_trees`] compares two directory trees, possibly held by different
//! backends, and returns the [`Operation`](dirtree_entry::Operation)s that
//! turn the first into the second. Applying them in order with
//! [`dirtree_store::Patch`] reproduces the second tree; writing them with
//! `dirtree_ldif::write_changes` gives an LDIF change document.

pub mod error;
pub mod tree_diff;

pub use error::{DiffError, DiffResult};
pub use tree_diff::{diff_subtrees, diff_trees};
