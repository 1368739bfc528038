use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dirtree_entry::{AttributeMap, Entry};
use dirtree_ldif::parse_entries;
use dirtree_name::{Dn, Rdn};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::FsTreeConfig;
use crate::error::{TreeError, TreeResult};
use crate::traits::{leaf_rdn, DirectoryTree};

const LDIF_SUFFIX: &str = ".ldif";
const DIR_SUFFIX: &str = ".dir";

/// File-name form of an RDN: its text with `/` written as `\2F`.
///
/// `\2F` is also the RFC 2253 hex escape for `/`, so the stem parses back
/// to the same RDN.
pub fn file_stem(rdn: &Rdn) -> String {
    rdn.to_string().replace('/', "\\2F")
}

/// The `.ldif` file beside a `.dir` directory: `a/b.dir` -> `a/b.ldif`.
fn ldif_beside(dir: &Path) -> Option<PathBuf> {
    let name = dir.file_name()?.to_str()?;
    let stem = name.strip_suffix(DIR_SUFFIX).unwrap_or(name);
    Some(dir.with_file_name(format!("{stem}{LDIF_SUFFIX}")))
}

/// The DN of the file at `relative` below the directory of `base`.
fn dn_below(base: &Dn, relative: &Path) -> Option<Dn> {
    let mut dn = base.clone();
    for component in relative.components() {
        let name = component.as_os_str().to_str()?;
        let stem = name
            .strip_suffix(DIR_SUFFIX)
            .or_else(|| name.strip_suffix(LDIF_SUFFIX))?;
        dn = dn.child(stem.parse().ok()?);
    }
    Some(dn)
}

/// Write `contents` to a temporary file next to `path`, then rename it over
/// `path`.
fn write_atomic(path: &Path, contents: &str) -> TreeResult<()> {
    let dir = path.parent().ok_or_else(|| TreeError::MissingIntermediateLink {
        path: path.to_path_buf(),
    })?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read the single entry stored at `path`.
fn read_entry(path: &Path) -> TreeResult<Entry> {
    let text = fs::read_to_string(path)?;
    let mut entries = parse_entries(&text)?;
    if entries.len() > 1 {
        return Err(TreeError::MultipleEntriesInFile {
            path: path.to_path_buf(),
        });
    }
    entries.pop().ok_or_else(|| TreeError::NoEntriesInFile {
        path: path.to_path_buf(),
    })
}

/// Handle of a node in an [`FsTree`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsNode {
    dn: Dn,
    ldif: PathBuf,
    dir: PathBuf,
}

impl FsNode {
    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /// The file holding this node's entry.
    pub fn ldif_path(&self) -> &Path {
        &self.ldif
    }

    /// The directory holding this node's children.
    pub fn dir_path(&self) -> &Path {
        &self.dir
    }

    fn child(&self, rdn: Rdn, stem: &str) -> FsNode {
        FsNode {
            dn: self.dn.child(rdn),
            ldif: self.dir.join(format!("{stem}{LDIF_SUFFIX}")),
            dir: self.dir.join(format!("{stem}{DIR_SUFFIX}")),
        }
    }
}

/// Directory tree stored as one LDIF file per entry.
///
/// # Layout
///
/// ```text
/// example.ldif                 root entry (optional)
/// example.dir/                 configured directory
///     ou=people.ldif
///     ou=people.dir/
///         cn=alice.ldif
/// ```
///
/// A node's children live in the `.dir` directory beside its `.ldif` file,
/// created when the first child is added and removed with the last one.
/// Entries are read from disk on every access; nothing is cached.
pub struct FsTree {
    config: FsTreeConfig,
    root: FsNode,
}

impl FsTree {
    /// Open the tree described by `config`, creating its directory if needed.
    pub fn open(config: FsTreeConfig) -> TreeResult<Self> {
        let dn = config.base_dn()?;
        fs::create_dir_all(&config.directory)?;
        let dir = fs::canonicalize(&config.directory)?;
        let ldif = ldif_beside(&dir).ok_or_else(|| {
            TreeError::Config(format!("{} cannot hold a tree", dir.display()))
        })?;
        debug!(directory = %dir.display(), base_dn = %dn, "opened file tree");
        Ok(Self {
            config,
            root: FsNode { dn, ldif, dir },
        })
    }

    pub fn config(&self) -> &FsTreeConfig {
        &self.config
    }

    fn is_root(&self, node: &FsNode) -> bool {
        node.dir == self.root.dir
    }

    /// Make sure `node` has a children directory.
    fn ensure_dir(&self, node: &FsNode) -> TreeResult<()> {
        if node.dir.is_dir() {
            return Ok(());
        }
        let missing = || TreeError::MissingIntermediateLink {
            path: node.dir.clone(),
        };
        if !self.is_root(node) && !node.ldif.is_file() {
            return Err(missing());
        }
        match fs::create_dir(&node.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(missing()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the children directory of `node` once it is empty.
    fn prune_dir(&self, node: &FsNode) -> TreeResult<()> {
        if self.is_root(node) || !node.dir.is_dir() {
            return Ok(());
        }
        if fs::read_dir(&node.dir)?.next().is_none() {
            fs::remove_dir(&node.dir)?;
        }
        Ok(())
    }

    fn rewrite_dn(path: &Path, dn: &Dn) -> TreeResult<()> {
        let (_, attributes) = read_entry(path)?.into_parts();
        write_atomic(path, &Entry::with_attributes(dn.clone(), attributes).to_ldif())
    }

    /// Rewrite the `dn:` line of every file in the subtree of `moved`.
    fn rewrite_subtree(&self, moved: &FsNode) -> TreeResult<()> {
        Self::rewrite_dn(&moved.ldif, &moved.dn)?;
        if !moved.dir.is_dir() {
            return Ok(());
        }
        for item in WalkDir::new(&moved.dir).min_depth(1) {
            let item = item.map_err(io::Error::from)?;
            let path = item.path();
            if !item.file_type().is_file() || !path.to_string_lossy().ends_with(LDIF_SUFFIX) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&moved.dir) else {
                continue;
            };
            match dn_below(&moved.dn, relative) {
                Some(dn) => Self::rewrite_dn(path, &dn)?,
                None => warn!(path = %path.display(), "skipping file with unparsable name"),
            }
        }
        Ok(())
    }
}

impl DirectoryTree for FsTree {
    type Node = FsNode;

    fn root(&self) -> FsNode {
        self.root.clone()
    }

    fn dn(&self, node: &FsNode) -> TreeResult<Dn> {
        Ok(node.dn.clone())
    }

    fn entry(&self, node: &FsNode) -> TreeResult<Entry> {
        match read_entry(&node.ldif) {
            Ok(entry) => {
                let (_, attributes) = entry.into_parts();
                Ok(Entry::with_attributes(node.dn.clone(), attributes))
            }
            Err(TreeError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                if self.is_root(node) {
                    Ok(Entry::new(node.dn.clone()))
                } else {
                    Err(TreeError::NotFound {
                        dn: node.dn.clone(),
                    })
                }
            }
            Err(e) => Err(e),
        }
    }

    fn parent(&self, node: &FsNode) -> TreeResult<Option<FsNode>> {
        if self.is_root(node) {
            return Ok(None);
        }
        let missing = || TreeError::MissingIntermediateLink {
            path: node.ldif.clone(),
        };
        let dir = node.ldif.parent().ok_or_else(missing)?;
        if dir == self.root.dir {
            return Ok(Some(self.root.clone()));
        }
        Ok(Some(FsNode {
            dn: node.dn.up()?,
            ldif: ldif_beside(dir).ok_or_else(missing)?,
            dir: dir.to_path_buf(),
        }))
    }

    fn children(&self, node: &FsNode) -> TreeResult<Vec<FsNode>> {
        if !node.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut children = Vec::new();
        for item in fs::read_dir(&node.dir)? {
            let path = item?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!(path = %path.display(), "skipping non UTF-8 file name");
                continue;
            };
            if let Some(stem) = name.strip_suffix(LDIF_SUFFIX) {
                match stem.parse::<Rdn>() {
                    Ok(rdn) => children.push(node.child(rdn, stem)),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping file with unparsable name")
                    }
                }
            } else if !(name.ends_with(DIR_SUFFIX) && path.is_dir()) {
                warn!(path = %path.display(), "skipping unrecognised directory content");
            }
        }
        children.sort_by(|a, b| a.dn.cmp(&b.dn));
        Ok(children)
    }

    fn add_child(
        &mut self,
        parent: &FsNode,
        rdn: Rdn,
        attributes: AttributeMap,
    ) -> TreeResult<FsNode> {
        if self.child(parent, &rdn)?.is_some() {
            return Err(TreeError::AlreadyExists {
                dn: parent.dn.child(rdn),
            });
        }
        self.ensure_dir(parent)?;
        let stem = file_stem(&rdn);
        let node = parent.child(rdn, &stem);
        write_atomic(
            &node.ldif,
            &Entry::with_attributes(node.dn.clone(), attributes).to_ldif(),
        )?;
        debug!(dn = %node.dn, path = %node.ldif.display(), "added entry");
        Ok(node)
    }

    fn delete_child(&mut self, parent: &FsNode, rdn: &Rdn) -> TreeResult<()> {
        let Some(child) = self.child(parent, rdn)? else {
            return Err(TreeError::NotFound {
                dn: parent.dn.child(rdn.clone()),
            });
        };
        // Anything left in the directory, recognised or not, keeps the node.
        if child.dir.is_dir() && fs::read_dir(&child.dir)?.next().is_some() {
            return Err(TreeError::NotLeaf { dn: child.dn });
        }
        fs::remove_file(&child.ldif)?;
        if child.dir.is_dir() {
            fs::remove_dir(&child.dir)?;
        }
        self.prune_dir(parent)?;
        debug!(dn = %child.dn, "deleted entry");
        Ok(())
    }

    fn set_attributes(&mut self, node: &FsNode, attributes: AttributeMap) -> TreeResult<()> {
        if !self.is_root(node) && !node.ldif.is_file() {
            return Err(TreeError::NotFound {
                dn: node.dn.clone(),
            });
        }
        write_atomic(
            &node.ldif,
            &Entry::with_attributes(node.dn.clone(), attributes).to_ldif(),
        )?;
        debug!(dn = %node.dn, "updated entry");
        Ok(())
    }

    fn move_to(&mut self, node: &FsNode, new_dn: &Dn) -> TreeResult<FsNode> {
        if self.is_root(node) {
            return Err(TreeError::CannotRemoveRoot {
                dn: node.dn.clone(),
            });
        }
        if node.dn == *new_dn {
            return Err(TreeError::AlreadyExists { dn: new_dn.clone() });
        }
        if node.dn.contains(new_dn) {
            return Err(TreeError::InvalidMove {
                dn: node.dn.clone(),
                target: new_dn.clone(),
            });
        }
        if !node.ldif.is_file() {
            return Err(TreeError::NotFound {
                dn: node.dn.clone(),
            });
        }
        let new_parent = self.lookup(&self.root, &new_dn.up()?)?;
        let rdn = leaf_rdn(new_dn)?.clone();
        if self.child(&new_parent, &rdn)?.is_some() {
            return Err(TreeError::AlreadyExists { dn: new_dn.clone() });
        }
        self.ensure_dir(&new_parent)?;
        let old_parent = self.parent(node)?;

        let stem = file_stem(&rdn);
        let moved = new_parent.child(rdn, &stem);
        fs::rename(&node.ldif, &moved.ldif)?;
        if node.dir.is_dir() {
            fs::rename(&node.dir, &moved.dir)?;
        }
        self.rewrite_subtree(&moved)?;
        if let Some(old_parent) = old_parent {
            self.prune_dir(&old_parent)?;
        }
        debug!(from = %node.dn, to = %moved.dn, "moved entry");
        Ok(moved)
    }
}
