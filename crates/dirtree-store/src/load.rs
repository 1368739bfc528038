use dirtree_ldif::parse_entries;
use tracing::debug;

use crate::error::TreeResult;
use crate::traits::{leaf_rdn, DirectoryTree};

/// Insert every entry of the LDIF document `text` at or below `base`.
///
/// Parents must come before their children. A record whose DN is the base
/// DN replaces the base's attributes. Returns the number of records stored.
pub fn load_ldif<T: DirectoryTree>(tree: &mut T, base: &T::Node, text: &str) -> TreeResult<usize> {
    let base_dn = tree.dn(base)?;
    let entries = parse_entries(text)?;
    for entry in &entries {
        if *entry.dn() == base_dn {
            tree.set_attributes(base, entry.attributes().clone())?;
            continue;
        }
        let parent = tree.lookup(base, &entry.dn().up()?)?;
        let rdn = leaf_rdn(entry.dn())?.clone();
        tree.add_child(&parent, rdn, entry.attributes().clone())?;
    }
    debug!(base = %base_dn, count = entries.len(), "loaded LDIF");
    Ok(entries.len())
}

/// Replicate the subtree at `src_node` onto `dst_node`, which must be a leaf.
///
/// The destination keeps its own DN; copied nodes are named by their
/// source RDNs. Returns the number of nodes written.
pub fn copy_tree<S, D>(
    src: &S,
    src_node: &S::Node,
    dst: &mut D,
    dst_node: &D::Node,
) -> TreeResult<usize>
where
    S: DirectoryTree,
    D: DirectoryTree,
{
    let (_, attributes) = src.entry(src_node)?.into_parts();
    dst.set_attributes(dst_node, attributes)?;
    Ok(1 + copy_children(src, src_node, dst, dst_node)?)
}

fn copy_children<S, D>(
    src: &S,
    src_node: &S::Node,
    dst: &mut D,
    dst_node: &D::Node,
) -> TreeResult<usize>
where
    S: DirectoryTree,
    D: DirectoryTree,
{
    let mut copied = 0;
    for child in src.children(src_node)? {
        let (dn, attributes) = src.entry(&child)?.into_parts();
        let added = dst.add_child(dst_node, leaf_rdn(&dn)?.clone(), attributes)?;
        copied += 1 + copy_children(src, &child, dst, &added)?;
    }
    Ok(copied)
}
