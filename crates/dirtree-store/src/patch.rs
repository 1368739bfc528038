use dirtree_entry::{AddOp, DeleteOp, ModifyOp, Operation};
use tracing::debug;

use crate::error::TreeResult;
use crate::traits::{leaf_rdn, DirectoryTree};

/// Apply a node-level operation to a tree.
///
/// Targets are resolved from the tree's root. A sequence of patches is not
/// transactional: a failure leaves earlier patches applied.
pub trait Patch {
    fn patch<T: DirectoryTree>(&self, tree: &mut T) -> TreeResult<()>;
}

impl Patch for ModifyOp {
    fn patch<T: DirectoryTree>(&self, tree: &mut T) -> TreeResult<()> {
        let node = tree.lookup(&tree.root(), &self.dn)?;
        tree.modify(&node, &self.modifications)
    }
}

impl Patch for AddOp {
    fn patch<T: DirectoryTree>(&self, tree: &mut T) -> TreeResult<()> {
        let dn = self.entry.dn();
        let parent = tree.lookup(&tree.root(), &dn.up()?)?;
        tree.add_child(&parent, leaf_rdn(dn)?.clone(), self.entry.attributes().clone())?;
        Ok(())
    }
}

impl Patch for DeleteOp {
    fn patch<T: DirectoryTree>(&self, tree: &mut T) -> TreeResult<()> {
        let node = tree.lookup(&tree.root(), &self.dn)?;
        tree.delete(&node)
    }
}

impl Patch for Operation {
    fn patch<T: DirectoryTree>(&self, tree: &mut T) -> TreeResult<()> {
        debug!(dn = %self.dn(), "applying operation");
        match self {
            Self::Modify(op) => op.patch(tree),
            Self::Add(op) => op.patch(tree),
            Self::Delete(op) => op.patch(tree),
        }
    }
}

/// Apply `operations` in order, stopping at the first failure.
pub fn patch_all<'a, T, I>(tree: &mut T, operations: I) -> TreeResult<usize>
where
    T: DirectoryTree,
    I: IntoIterator<Item = &'a Operation>,
{
    let mut applied = 0;
    for operation in operations {
        operation.patch(tree)?;
        applied += 1;
    }
    Ok(applied)
}
