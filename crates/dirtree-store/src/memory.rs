use dirtree_entry::{AttributeMap, Entry};
use dirtree_name::{Dn, Rdn};
use tracing::debug;

use crate::error::{TreeError, TreeResult};
use crate::traits::{leaf_rdn, DirectoryTree};

/// Handle of a node in an [`InMemoryTree`].
///
/// A slot freed by a delete is handed out again, but with a new generation,
/// so a handle to the deleted node never resolves to its successor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

const ROOT: NodeId = NodeId {
    index: 0,
    generation: 0,
};

struct Slot {
    generation: u32,
    node: Option<Node>,
}

struct Node {
    /// `None` only for the root.
    rdn: Option<Rdn>,
    attributes: AttributeMap,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed directory tree held entirely in memory.
///
/// Nodes live in a slot table indexed by [`NodeId`]; parent and child
/// links are ids. Freed slots are reused before the table grows. Children keep insertion order. A node's DN is computed
/// by walking up to the root, so moving a subtree only relinks one node.
pub struct InMemoryTree {
    root_dn: Dn,
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl InMemoryTree {
    /// A tree whose root is an attribute-less entry at `root_dn`.
    pub fn new(root_dn: Dn) -> Self {
        Self::with_root(Entry::new(root_dn))
    }

    /// A tree whose root is `entry`.
    pub fn with_root(entry: Entry) -> Self {
        let (root_dn, attributes) = entry.into_parts();
        Self {
            root_dn,
            slots: vec![Slot {
                generation: ROOT.generation,
                node: Some(Node {
                    rdn: None,
                    attributes,
                    parent: None,
                    children: Vec::new(),
                }),
            }],
            free: Vec::new(),
        }
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn node(&self, id: NodeId) -> TreeResult<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(TreeError::StaleHandle)
    }

    fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(TreeError::StaleHandle)
    }

    fn insert(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        let slot = &mut self.slots[id.index];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
    }

    fn find_child(&self, parent: NodeId, rdn: &Rdn) -> TreeResult<Option<NodeId>> {
        for &child in &self.node(parent)?.children {
            if self.node(child)?.rdn.as_ref() == Some(rdn) {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }
}

impl Default for InMemoryTree {
    fn default() -> Self {
        Self::new(Dn::empty())
    }
}

impl DirectoryTree for InMemoryTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        ROOT
    }

    fn dn(&self, node: &NodeId) -> TreeResult<Dn> {
        let mut rdns = Vec::new();
        let mut current = self.node(*node)?;
        while let (Some(rdn), Some(parent)) = (&current.rdn, current.parent) {
            rdns.push(rdn.clone());
            current = self.node(parent)?;
        }
        rdns.extend(self.root_dn.rdns().iter().cloned());
        Ok(Dn::from_rdns(rdns))
    }

    fn entry(&self, node: &NodeId) -> TreeResult<Entry> {
        let attributes = self.node(*node)?.attributes.clone();
        Ok(Entry::with_attributes(self.dn(node)?, attributes))
    }

    fn parent(&self, node: &NodeId) -> TreeResult<Option<NodeId>> {
        Ok(self.node(*node)?.parent)
    }

    fn children(&self, node: &NodeId) -> TreeResult<Vec<NodeId>> {
        Ok(self.node(*node)?.children.clone())
    }

    fn child(&self, parent: &NodeId, rdn: &Rdn) -> TreeResult<Option<NodeId>> {
        self.find_child(*parent, rdn)
    }

    fn add_child(
        &mut self,
        parent: &NodeId,
        rdn: Rdn,
        attributes: AttributeMap,
    ) -> TreeResult<NodeId> {
        let dn = self.dn(parent)?.child(rdn.clone());
        if self.find_child(*parent, &rdn)?.is_some() {
            return Err(TreeError::AlreadyExists { dn });
        }
        debug!(dn = %dn, "adding entry");
        let id = self.insert(Node {
            rdn: Some(rdn),
            attributes,
            parent: Some(*parent),
            children: Vec::new(),
        });
        self.node_mut(*parent)?.children.push(id);
        Ok(id)
    }

    fn delete_child(&mut self, parent: &NodeId, rdn: &Rdn) -> TreeResult<()> {
        let Some(child) = self.find_child(*parent, rdn)? else {
            return Err(TreeError::NotFound {
                dn: self.dn(parent)?.child(rdn.clone()),
            });
        };
        let dn = self.dn(&child)?;
        if !self.node(child)?.children.is_empty() {
            return Err(TreeError::NotLeaf { dn });
        }
        debug!(dn = %dn, "deleting entry");
        self.node_mut(*parent)?.children.retain(|&c| c != child);
        self.release(child);
        Ok(())
    }

    fn set_attributes(&mut self, node: &NodeId, attributes: AttributeMap) -> TreeResult<()> {
        self.node_mut(*node)?.attributes = attributes;
        Ok(())
    }

    fn move_to(&mut self, node: &NodeId, new_dn: &Dn) -> TreeResult<NodeId> {
        let dn = self.dn(node)?;
        let Some(old_parent) = self.node(*node)?.parent else {
            return Err(TreeError::CannotRemoveRoot { dn });
        };
        if dn == *new_dn {
            return Err(TreeError::AlreadyExists { dn });
        }
        if dn.contains(new_dn) {
            return Err(TreeError::InvalidMove {
                dn,
                target: new_dn.clone(),
            });
        }
        let new_parent = self.lookup(&ROOT, &new_dn.up()?)?;
        let rdn = leaf_rdn(new_dn)?.clone();
        if self.find_child(new_parent, &rdn)?.is_some() {
            return Err(TreeError::AlreadyExists { dn: new_dn.clone() });
        }

        debug!(from = %dn, to = %new_dn, "moving entry");
        self.node_mut(old_parent)?.children.retain(|c| c != node);
        self.node_mut(new_parent)?.children.push(*node);
        let moved = self.node_mut(*node)?;
        moved.parent = Some(new_parent);
        moved.rdn = Some(rdn);
        Ok(*node)
    }
}
