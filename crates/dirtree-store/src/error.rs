use std::path::PathBuf;

use dirtree_entry::EntryError;
use dirtree_filter::FilterError;
use dirtree_ldif::LdifError;
use dirtree_name::{Dn, NameError};
use thiserror::Error;

/// Errors produced by tree storage backends.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("no such entry: {dn}")]
    NotFound { dn: Dn },

    #[error("entry already exists: {dn}")]
    AlreadyExists { dn: Dn },

    #[error("entry has children: {dn}")]
    NotLeaf { dn: Dn },

    #[error("cannot remove the tree root {dn}")]
    CannotRemoveRoot { dn: Dn },

    #[error("cannot move {dn} to {target}, which lies below it")]
    InvalidMove { dn: Dn, target: Dn },

    #[error("node handle does not refer to a live entry")]
    StaleHandle,

    #[error("more than one entry in {}", path.display())]
    MultipleEntriesInFile { path: PathBuf },

    #[error("no entry in {}", path.display())]
    NoEntriesInFile { path: PathBuf },

    #[error("missing intermediate directory {}", path.display())]
    MissingIntermediateLink { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LDIF error: {0}")]
    Ldif(#[from] LdifError),

    #[error("name error: {0}")]
    Name(#[from] NameError),

    #[error("entry error: {0}")]
    Entry(#[from] EntryError),

    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type TreeResult<T> = Result<T, TreeError>;
