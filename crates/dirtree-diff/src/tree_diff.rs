//! Tree-level diff: compare two directory trees node by node.
//!
//! Children are matched by RDN. Every step visits siblings in RDN order, so
//! the same pair of trees always yields the same operation list.

use std::collections::BTreeMap;

use dirtree_entry::{AddOp, DeleteOp, Entry, Operation};
use dirtree_name::Rdn;
use dirtree_store::DirectoryTree;
use tracing::debug;

use crate::error::{DiffError, DiffResult};

/// Compare the whole of `a` against the whole of `b`.
pub fn diff_trees<A, B>(a: &A, b: &B) -> DiffResult<Vec<Operation>>
where
    A: DirectoryTree,
    B: DirectoryTree,
{
    diff_subtrees(a, &a.root(), b, &b.root())
}

/// Operations that turn the subtree at `a_node` into the subtree at `b_node`.
///
/// The result lists, in order:
///
/// 1. the modification of the starting entry, if its attributes differ;
/// 2. the operations for each child present on both sides, recursively;
/// 3. an [`AddOp`] for every node of each subtree only in `b`, parents first;
/// 4. a [`DeleteOp`] for every node of each subtree only in `a`, deepest first.
///
/// Both starting nodes must have the same DN.
pub fn diff_subtrees<A, B>(
    a: &A,
    a_node: &A::Node,
    b: &B,
    b_node: &B::Node,
) -> DiffResult<Vec<Operation>>
where
    A: DirectoryTree,
    B: DirectoryTree,
{
    let a_entry = a.entry(a_node)?;
    let b_entry = b.entry(b_node)?;
    if a_entry.dn() != b_entry.dn() {
        return Err(DiffError::RootMismatch {
            a: a_entry.dn().clone(),
            b: b_entry.dn().clone(),
        });
    }
    let mut ops = Vec::new();
    diff_nodes(a, a_node, &a_entry, b, b_node, &b_entry, &mut ops)?;
    debug!(dn = %a_entry.dn(), operations = ops.len(), "diffed subtrees");
    Ok(ops)
}

fn diff_nodes<A, B>(
    a: &A,
    a_node: &A::Node,
    a_entry: &Entry,
    b: &B,
    b_node: &B::Node,
    b_entry: &Entry,
    ops: &mut Vec<Operation>,
) -> DiffResult<()>
where
    A: DirectoryTree,
    B: DirectoryTree,
{
    if let Some(op) = a_entry.diff(b_entry) {
        ops.push(op.into());
    }

    let a_children = children_by_rdn(a, a_node)?;
    let b_children = children_by_rdn(b, b_node)?;

    for (rdn, a_child) in &a_children {
        if let Some(b_child) = b_children.get(rdn) {
            let a_entry = a.entry(a_child)?;
            let b_entry = b.entry(b_child)?;
            diff_nodes(a, a_child, &a_entry, b, b_child, &b_entry, ops)?;
        }
    }
    for (rdn, b_child) in &b_children {
        if !a_children.contains_key(rdn) {
            push_adds(b, b_child, ops)?;
        }
    }
    for (rdn, a_child) in &a_children {
        if !b_children.contains_key(rdn) {
            push_deletes(a, a_child, ops)?;
        }
    }
    Ok(())
}

fn children_by_rdn<T: DirectoryTree>(
    tree: &T,
    node: &T::Node,
) -> DiffResult<BTreeMap<Rdn, T::Node>> {
    let mut children = BTreeMap::new();
    for child in tree.children(node)? {
        let dn = tree.dn(&child)?;
        if let Some(rdn) = dn.rdn() {
            children.insert(rdn.clone(), child);
        }
    }
    Ok(children)
}

/// Preorder: a node is added before its children.
fn push_adds<T: DirectoryTree>(
    tree: &T,
    node: &T::Node,
    ops: &mut Vec<Operation>,
) -> DiffResult<()> {
    ops.push(AddOp::new(tree.entry(node)?).into());
    for child in children_by_rdn(tree, node)?.values() {
        push_adds(tree, child, ops)?;
    }
    Ok(())
}

/// Postorder: a node is deleted after its children.
fn push_deletes<T: DirectoryTree>(
    tree: &T,
    node: &T::Node,
    ops: &mut Vec<Operation>,
) -> DiffResult<()> {
    for child in children_by_rdn(tree, node)?.values() {
        push_deletes(tree, child, ops)?;
    }
    ops.push(DeleteOp::new(tree.dn(node)?).into());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirtree_entry::{AttributeMap, Modification, ModifyOp};
    use dirtree_ldif::write_changes;
    use dirtree_name::Dn;
    use dirtree_store::{patch_all, FsTree, FsTreeConfig, InMemoryTree};
    use proptest::prelude::*;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    fn person(cn: &str) -> AttributeMap {
        AttributeMap::from_pairs([("objectClass", vec!["person"]), ("cn", vec![cn])])
    }

    fn add<T: DirectoryTree>(tree: &mut T, parent: &str, rdn: &str, attrs: AttributeMap) {
        let parent = tree.lookup(&tree.root(), &dn(parent)).unwrap();
        tree.add_child(&parent, rdn.parse().unwrap(), attrs).unwrap();
    }

    /// `dc=example` holding `ou=people` (alice, bob) and `ou=groups`.
    fn base<T: DirectoryTree>(tree: &mut T) {
        add(tree, "dc=example", "ou=people", AttributeMap::new());
        add(tree, "ou=people,dc=example", "cn=alice", person("alice"));
        add(tree, "ou=people,dc=example", "cn=bob", person("bob"));
        add(tree, "dc=example", "ou=groups", AttributeMap::new());
    }

    fn memory() -> InMemoryTree {
        let mut t = InMemoryTree::new(dn("dc=example"));
        base(&mut t);
        t
    }

    fn kinds(ops: &[Operation]) -> Vec<String> {
        ops.iter()
            .map(|op| {
                let kind = match op {
                    Operation::Modify(_) => "modify",
                    Operation::Add(_) => "add",
                    Operation::Delete(_) => "delete",
                };
                format!("{kind} {}", op.dn())
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Operation lists
    // -----------------------------------------------------------------------

    #[test]
    fn identical_trees_no_operations() {
        assert!(diff_trees(&memory(), &memory()).unwrap().is_empty());
    }

    #[test]
    fn root_mismatch() {
        let other = InMemoryTree::new(dn("dc=other"));
        assert!(matches!(
            diff_trees(&memory(), &other),
            Err(DiffError::RootMismatch { .. })
        ));
    }

    #[test]
    fn ordering_of_changes() {
        let a = memory();
        let mut b = InMemoryTree::with_root(Entry::with_attributes(
            dn("dc=example"),
            AttributeMap::from_pairs([("dc", vec!["example"])]),
        ));
        add(&mut b, "dc=example", "ou=people", AttributeMap::new());
        add(&mut b, "ou=people,dc=example", "cn=alice", person("alice"));
        add(&mut b, "ou=people,dc=example", "cn=carol", person("carol"));
        add(&mut b, "dc=example", "ou=admins", AttributeMap::new());
        add(&mut b, "ou=admins,dc=example", "cn=root", person("root"));

        let ops = diff_trees(&a, &b).unwrap();
        assert_eq!(
            kinds(&ops),
            vec![
                "modify dc=example",
                "add cn=carol,ou=people,dc=example",
                "delete cn=bob,ou=people,dc=example",
                "add ou=admins,dc=example",
                "add cn=root,ou=admins,dc=example",
                "delete ou=groups,dc=example",
            ]
        );
    }

    #[test]
    fn deleted_subtree_is_removed_deepest_first() {
        let a = memory();
        let b = InMemoryTree::new(dn("dc=example"));
        let ops = diff_trees(&a, &b).unwrap();
        assert_eq!(
            kinds(&ops),
            vec![
                "delete ou=groups,dc=example",
                "delete cn=alice,ou=people,dc=example",
                "delete cn=bob,ou=people,dc=example",
                "delete ou=people,dc=example",
            ]
        );
    }

    #[test]
    fn attribute_change_is_a_modify() {
        let a = memory();
        let mut b = memory();
        let bob = b.lookup(&b.root(), &dn("cn=bob,ou=people,dc=example")).unwrap();
        b.modify(&bob, &[Modification::add("mail", ["bob@example.com"])])
            .unwrap();

        let ops = diff_trees(&a, &b).unwrap();
        assert_eq!(
            ops,
            vec![Operation::from(ModifyOp::new(
                dn("cn=bob,ou=people,dc=example"),
                vec![Modification::add("mail", ["bob@example.com"])],
            ))]
        );
        assert_eq!(
            write_changes(&ops),
            "version: 1\n\n\
             dn: cn=bob,ou=people,dc=example\n\
             changetype: modify\n\
             add: mail\n\
             mail: bob@example.com\n\
             -\n\n"
        );
    }

    #[test]
    fn subtree_diff() {
        let a = memory();
        let mut b = memory();
        add(&mut b, "ou=groups,dc=example", "cn=admins", AttributeMap::new());
        let a_groups = a.lookup(&a.root(), &dn("ou=groups,dc=example")).unwrap();
        let b_groups = b.lookup(&b.root(), &dn("ou=groups,dc=example")).unwrap();
        let ops = diff_subtrees(&a, &a_groups, &b, &b_groups).unwrap();
        assert_eq!(kinds(&ops), vec!["add cn=admins,ou=groups,dc=example"]);

        let a_people = a.lookup(&a.root(), &dn("ou=people,dc=example")).unwrap();
        assert!(matches!(
            diff_subtrees(&a, &a_people, &b, &b_groups),
            Err(DiffError::RootMismatch { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Diff then patch
    // -----------------------------------------------------------------------

    fn assert_patch_reproduces<A: DirectoryTree, B: DirectoryTree>(a: &mut A, b: &B) {
        let ops = diff_trees(a, b).unwrap();
        patch_all(a, &ops).unwrap();
        assert!(diff_trees(a, b).unwrap().is_empty());
        assert_eq!(
            a.subtree(&a.root()).unwrap().len(),
            b.subtree(&b.root()).unwrap().len()
        );
    }

    #[test]
    fn patch_reproduces_target_across_backends() {
        let dir = tempfile::tempdir().unwrap();
        let config = FsTreeConfig::new(dir.path().join("example.dir"), "dc=example");
        let mut on_disk = FsTree::open(config).unwrap();
        base(&mut on_disk);

        let mut target = InMemoryTree::new(dn("dc=example"));
        add(&mut target, "dc=example", "ou=people", AttributeMap::new());
        add(&mut target, "ou=people,dc=example", "cn=bob", person("robert"));
        add(&mut target, "dc=example", "ou=hosts", AttributeMap::new());
        add(&mut target, "ou=hosts,dc=example", "cn=web/1", person("web/1"));

        assert_patch_reproduces(&mut on_disk, &target);

        let mut back = memory();
        assert_patch_reproduces(&mut back, &on_disk);
    }

    /// Build a tree below `dc=example` from `(parent pick, name, value)`
    /// triples. Names come from a small pool so two trees overlap.
    fn build(spec: &[(usize, u8, u8)]) -> InMemoryTree {
        let mut tree = InMemoryTree::new(dn("dc=example"));
        let mut nodes = vec![tree.root()];
        for &(pick, name, value) in spec {
            let parent = nodes[pick % nodes.len()];
            let name = format!("n{name}");
            let rdn = Rdn::single("cn", name.as_str());
            if tree.child(&parent, &rdn).unwrap().is_some() {
                continue;
            }
            let attrs = AttributeMap::from_pairs([
                ("cn", vec![name.clone()]),
                ("description", vec![format!("v{value}")]),
            ]);
            nodes.push(tree.add_child(&parent, rdn, attrs).unwrap());
        }
        tree
    }

    fn tree_spec() -> impl Strategy<Value = Vec<(usize, u8, u8)>> {
        prop::collection::vec((0usize..8, 0u8..4, 0u8..3), 0..12)
    }

    proptest! {
        #[test]
        fn diff_then_patch_is_identity(a in tree_spec(), b in tree_spec()) {
            let mut a = build(&a);
            let b = build(&b);
            let ops = diff_trees(&a, &b).unwrap();
            patch_all(&mut a, &ops).unwrap();
            prop_assert!(diff_trees(&a, &b).unwrap().is_empty());
            prop_assert!(diff_trees(&b, &a).unwrap().is_empty());
        }
    }
}
