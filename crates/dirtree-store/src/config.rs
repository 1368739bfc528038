use std::path::PathBuf;

use dirtree_name::Dn;
use serde::{Deserialize, Serialize};

use crate::error::{TreeError, TreeResult};

/// Configuration for [`FsTree`](crate::FsTree).
///
/// ```toml
/// directory = "/var/lib/dirtree/example.dir"
/// base_dn = "dc=example,dc=com"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsTreeConfig {
    /// Directory holding the children of the root entry.
    pub directory: PathBuf,
    /// DN of the root entry.
    pub base_dn: String,
}

impl Default for FsTreeConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("dirtree.dir"),
            base_dn: String::new(),
        }
    }
}

impl FsTreeConfig {
    pub fn new(directory: impl Into<PathBuf>, base_dn: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            base_dn: base_dn.into(),
        }
    }

    /// Parse a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> TreeResult<Self> {
        toml::from_str(text).map_err(|e| TreeError::Config(e.to_string()))
    }

    /// The parsed root DN.
    pub fn base_dn(&self) -> TreeResult<Dn> {
        Dn::parse(&self.base_dn).map_err(|e| TreeError::Config(e.to_string()))
    }
}
