use std::fmt;

use dirtree_entry::{AttributeMap, Entry, Modification};
use dirtree_filter::{parse_filter, Filter};
use dirtree_name::{Dn, NameError, Rdn};

use crate::error::{TreeError, TreeResult};
use crate::search::{Scope, SearchRequest};

/// The leading RDN of `dn`, or `EmptyDn` for the empty DN.
pub(crate) fn leaf_rdn(dn: &Dn) -> TreeResult<&Rdn> {
    dn.rdn().ok_or(TreeError::Name(NameError::EmptyDn))
}

/// A hierarchical store of directory entries.
///
/// Nodes are addressed by backend-specific handles. A handle stays valid
/// until the node it names is deleted or moved; [`move_to`] returns the
/// handle to use afterwards.
///
/// All implementations must satisfy these invariants:
/// - Every child's DN is its parent's DN with one RDN prepended.
/// - RDNs are unique among siblings.
/// - The root is never removed.
/// - Mutations are not transactional across calls.
///
/// [`move_to`]: DirectoryTree::move_to
pub trait DirectoryTree {
    /// Handle naming one node of the tree.
    type Node: Clone + fmt::Debug;

    /// The top of this tree.
    fn root(&self) -> Self::Node;

    fn dn(&self, node: &Self::Node) -> TreeResult<Dn>;

    /// The node's DN and attributes.
    fn entry(&self, node: &Self::Node) -> TreeResult<Entry>;

    /// The owning node, or `None` for the root.
    fn parent(&self, node: &Self::Node) -> TreeResult<Option<Self::Node>>;

    /// A snapshot of the immediate children.
    fn children(&self, node: &Self::Node) -> TreeResult<Vec<Self::Node>>;

    /// Create a child named `rdn` below `parent`.
    ///
    /// Fails with `AlreadyExists` if `parent` already has a child `rdn`.
    fn add_child(
        &mut self,
        parent: &Self::Node,
        rdn: Rdn,
        attributes: AttributeMap,
    ) -> TreeResult<Self::Node>;

    /// Remove the leaf child `rdn` of `parent`.
    ///
    /// Fails with `NotFound` if there is no such child and `NotLeaf` if it
    /// has children of its own.
    fn delete_child(&mut self, parent: &Self::Node, rdn: &Rdn) -> TreeResult<()>;

    /// Replace every attribute of `node`.
    fn set_attributes(&mut self, node: &Self::Node, attributes: AttributeMap) -> TreeResult<()>;

    /// Reattach `node` and its subtree as `new_dn`.
    ///
    /// The new parent is `lookup(root, new_dn.up())`. Descendant DNs follow
    /// the move. Fails with `CannotRemoveRoot` for the root, `InvalidMove`
    /// when `new_dn` lies below `node`, and `AlreadyExists` when `new_dn` is
    /// taken.
    fn move_to(&mut self, node: &Self::Node, new_dn: &Dn) -> TreeResult<Self::Node>;

    /// The child of `parent` named `rdn`, if any.
    fn child(&self, parent: &Self::Node, rdn: &Rdn) -> TreeResult<Option<Self::Node>> {
        for child in self.children(parent)? {
            if self.dn(&child)?.rdn() == Some(rdn) {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Call `visit` on each immediate child.
    fn children_with<F>(&self, node: &Self::Node, mut visit: F) -> TreeResult<()>
    where
        F: FnMut(&Self::Node) -> TreeResult<()>,
    {
        for child in self.children(node)? {
            visit(&child)?;
        }
        Ok(())
    }

    /// `node` and all its descendants in preorder.
    fn subtree(&self, node: &Self::Node) -> TreeResult<Vec<Self::Node>> {
        let mut nodes = Vec::new();
        self.subtree_with(node, |n| {
            nodes.push(n.clone());
            Ok(())
        })?;
        Ok(nodes)
    }

    /// Call `visit` on `node` and all its descendants in preorder.
    fn subtree_with<F>(&self, node: &Self::Node, mut visit: F) -> TreeResult<()>
    where
        F: FnMut(&Self::Node) -> TreeResult<()>,
    {
        preorder(self, node, &mut visit)
    }

    /// Resolve `dn` at or below `base`.
    fn lookup(&self, base: &Self::Node, dn: &Dn) -> TreeResult<Self::Node> {
        let base_dn = self.dn(base)?;
        let not_found = || TreeError::NotFound { dn: dn.clone() };
        let relative = base_dn.relative_rdns(dn).ok_or_else(not_found)?;
        let mut node = base.clone();
        for rdn in relative.iter().rev() {
            node = self.child(&node, rdn)?.ok_or_else(not_found)?;
        }
        Ok(node)
    }

    /// Remove the leaf `node`.
    fn delete(&mut self, node: &Self::Node) -> TreeResult<()> {
        let dn = self.dn(node)?;
        let Some(parent) = self.parent(node)? else {
            return Err(TreeError::CannotRemoveRoot { dn });
        };
        self.delete_child(&parent, leaf_rdn(&dn)?)
    }

    /// Apply `modifications` in order, then store the result.
    ///
    /// Nothing is stored if any modification fails.
    fn modify(&mut self, node: &Self::Node, modifications: &[Modification]) -> TreeResult<()> {
        let mut entry = self.entry(node)?;
        for modification in modifications {
            modification.patch(&mut entry)?;
        }
        let (_, attributes) = entry.into_parts();
        self.set_attributes(node, attributes)
    }

    /// Deliver each matching entry in scope to `callback`, in preorder.
    ///
    /// Returns the number of entries delivered.
    fn search_with<F>(
        &self,
        base: &Self::Node,
        request: &SearchRequest,
        mut callback: F,
    ) -> TreeResult<usize>
    where
        F: FnMut(Entry) -> TreeResult<()>,
    {
        let candidates = match request.scope {
            Scope::BaseObject => vec![base.clone()],
            Scope::SingleLevel => self.children(base)?,
            Scope::WholeSubtree => self.subtree(base)?,
        };
        let limit = request.limit();
        let mut delivered = 0;
        for node in candidates {
            if limit.is_some_and(|max| delivered >= max) {
                break;
            }
            let entry = self.entry(&node)?;
            if request.filter.matches(&entry) {
                callback(entry.project(&request.attributes))?;
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Collect the entries [`search_with`](DirectoryTree::search_with) delivers.
    fn search(&self, base: &Self::Node, request: &SearchRequest) -> TreeResult<Vec<Entry>> {
        let mut entries = Vec::new();
        self.search_with(base, request, |entry| {
            entries.push(entry);
            Ok(())
        })?;
        Ok(entries)
    }

    /// Search with a filter given in text form.
    fn search_text(&self, base: &Self::Node, filter: &str, scope: Scope) -> TreeResult<Vec<Entry>> {
        let request = SearchRequest::new(parse_filter(filter)?).with_scope(scope);
        self.search(base, &request)
    }

    /// Evaluate `filter` against the entry at `node`.
    fn matches(&self, node: &Self::Node, filter: &Filter) -> TreeResult<bool> {
        Ok(filter.matches(&self.entry(node)?))
    }
}

fn preorder<T: DirectoryTree + ?Sized>(
    tree: &T,
    node: &T::Node,
    visit: &mut dyn FnMut(&T::Node) -> TreeResult<()>,
) -> TreeResult<()> {
    visit(node)?;
    for child in tree.children(node)? {
        preorder(tree, &child, visit)?;
    }
    Ok(())
}
