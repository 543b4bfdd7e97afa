use std::ops::Index;

use super::tree::{NodeId, ProjectTree, TreeItem};

/// Flattened pre-order snapshot of a project tree.
///
/// The index borrows the tree it was built from, so the tree cannot change
/// underneath it; after a re-parse build a new index.
pub struct FileIndex<'a> {
    tree: &'a ProjectTree,
    items: Vec<NodeId>,
}

impl<'a> FileIndex<'a> {
    /// Materialize the root and every item below it, depth-first pre-order.
    pub fn build(tree: &'a ProjectTree) -> Self {
        let items = tree.iter_recursive(tree.root()).collect();
        Self { tree, items }
    }

    pub fn tree(&self) -> &'a ProjectTree {
        self.tree
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Node at `position`, if any.
    pub fn id_at(&self, position: usize) -> Option<NodeId> {
        self.items.get(position).copied()
    }

    pub fn get(&self, position: usize) -> Option<&'a TreeItem> {
        let tree = self.tree;
        self.id_at(position).map(|id| &tree[id])
    }

    /// Linear scan; callers needing frequent reverse lookups keep their own map.
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        self.items.iter().position(|&item| item == id)
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.items
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (NodeId, &'a TreeItem)> + '_ {
        let tree = self.tree;
        self.items.iter().map(move |&id| (id, &tree[id]))
    }
}

impl<'a> Index<usize> for FileIndex<'a> {
    type Output = TreeItem;

    fn index(&self, position: usize) -> &TreeItem {
        &self.tree[self.items[position]]
    }
}
