//! Directory tree storage for the dirtree engine.
//!
//! A directory tree is a hierarchy of entries in which every child's DN is
//! its parent's DN with one RDN prepended. This crate defines the tree
//! contract and two backends for it.
//!
//! # Storage Backends
//!
//! All backends implement the [`DirectoryTree`] trait:
//!
//! - [`InMemoryTree`] -- arena of nodes addressed by [`NodeId`]
//! - [`FsTree`] -- one LDIF file per entry, children in a sibling `.dir`
//!   directory, configured by [`FsTreeConfig`]
//!
//! # Operations
//!
//! - navigation: `parent`, `children`, `subtree`, `lookup`
//! - mutation: `add_child`, `delete`, `modify`, `move_to`
//! - [`SearchRequest`] with a [`Scope`], size limit and attribute list
//! - [`Patch`] applies an [`Operation`](dirtree_entry::Operation) resolved
//!   from the root
//! - [`load_ldif`] and [`copy_tree`] for bulk transfer
//!
//! # Design Rules
//!
//! 1. RDNs are unique among siblings; the root is never removed.
//! 2. All calls block; callers serialize mutations (`&mut self`).
//! 3. Sequences of mutations are not transactional.
//! 4. I/O errors are propagated as [`TreeError::Io`], never retried.

pub mod config;
pub mod error;
pub mod fs;
pub mod load;
pub mod memory;
pub mod patch;
pub mod search;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::FsTreeConfig;
pub use error::{TreeError, TreeResult};
pub use fs::{FsNode, FsTree};
pub use load::{copy_tree, load_ldif};
pub use memory::{InMemoryTree, NodeId};
pub use patch::{patch_all, Patch};
pub use search::{Scope, SearchRequest};
pub use traits::DirectoryTree;
